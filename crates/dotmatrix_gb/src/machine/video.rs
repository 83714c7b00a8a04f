use std::cell::RefCell;
use std::rc::Rc;

use dotmatrix_common::{Color, FrameSink};

use super::interrupts::{Interrupt, InterruptMaster};
use super::map;
use super::mmu::Mmu;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// T-cycles the controller spends scanning OAM at the start of each visible
/// scanline (mode 2).
const OAM_CLOCKS: u32 = 80;
/// T-cycles of the VRAM-transfer phase of a scanline (mode 3).
const VRAM_CLOCKS: u32 = 172;
/// T-cycles of the horizontal blank (mode 0).
const HBLANK_CLOCKS: u32 = 204;
/// Total T-cycles per scanline.
const LINE_CLOCKS: u32 = OAM_CLOCKS + VRAM_CLOCKS + HBLANK_CLOCKS;
/// Position within a line at which the scanline is emitted.
const DRAW_CLOCKS: u32 = OAM_CLOCKS + VRAM_CLOCKS;
/// T-cycles of the vertical blank (mode 1).
const VBLANK_CLOCKS: u32 = 4560;
/// T-cycles at which the vertical blank begins.
const VBLANK_START: u32 = LINE_CLOCKS * SCREEN_HEIGHT as u32;
/// Total T-cycles per frame.
const FRAME_CLOCKS: u32 = VBLANK_START + VBLANK_CLOCKS;

/// Size of one tile's data in bytes.
const TILE_BYTES: u16 = 16;
/// Tiles per row in the 32x32 background map.
const BG_WIDTH_TILES: u16 = 32;

/// Decoded dot codes of one 8x8 tile, row-major.
type TileDots = [u8; 64];

/// The four DMG shades, indexed by BGP selector value.
const SHADES: [Color; 4] = [
    Color::new_rgba(0, 0, 0, 255),
    Color::new_rgba(98, 78, 80, 255),
    Color::new_rgba(219, 179, 180, 255),
    Color::new_rgba(255, 255, 255, 255),
];

/// LCD controller modes, as exposed in STAT bits 0-1.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    VramTransfer = 3,
}

/// Scanline-phase video controller.
///
/// Walks the frame one T-cycle at a time: mode 2 (OAM scan), mode 3 (VRAM
/// transfer) and mode 0 (HBlank) for each of the 144 visible lines, then
/// mode 1 for the vertical blank. Register snapshots are taken at the
/// hardware's latch points: LCDC and ScrollY at the top of the frame,
/// ScrollX and the background palette at the top of each line, tile data on
/// entry to mode 3.
pub(super) struct VideoController {
    /// Position within the current frame, in T-cycles.
    pub(super) frame_tick: u32,
    lcdc: LcdcConfig,
    scroll_x: u8,
    scroll_y: u8,
    bg_palette: [Color; 4],
    /// Dot codes for the 256 tiles of the active data table, decoded on
    /// entry to mode 3 for the line being drawn.
    tiles: Box<[TileDots; 256]>,
    /// Latched OR of the enabled STAT interrupt sources; the STAT interrupt
    /// fires on this line's rising edge.
    stat_line: bool,
    mmu: Rc<RefCell<Mmu>>,
    interrupts: Rc<RefCell<InterruptMaster>>,
    sink: Box<dyn FrameSink>,
}

impl VideoController {
    pub(super) fn new(
        mmu: Rc<RefCell<Mmu>>,
        interrupts: Rc<RefCell<InterruptMaster>>,
        sink: Box<dyn FrameSink>,
    ) -> VideoController {
        VideoController {
            frame_tick: 0,
            lcdc: LcdcConfig::decode(0),
            scroll_x: 0,
            scroll_y: 0,
            bg_palette: decode_bg_palette(0),
            tiles: Box::new([[0; 64]; 256]),
            stat_line: false,
            mmu,
            interrupts,
            sink,
        }
    }

    /// Advance the controller by `cycles` T-cycles.
    ///
    /// While LCDC bit 7 is clear the frame clock is held at zero and LY
    /// reads as 0, so re-enabling the LCD always restarts at the top of a
    /// frame.
    pub(super) fn tick(&mut self, cycles: u32) {
        let mmu_rc = self.mmu.clone();
        let mut mmu = mmu_rc.borrow_mut();

        if !LcdcConfig::decode(mmu.read(map::LCDC_ADDR)).lcd_on {
            self.frame_tick = 0;
            self.stat_line = false;
            mmu.write_silent(map::LY_ADDR, 0);
            self.set_mode(&mut mmu, Mode::HBlank);
            return;
        }

        for _ in 0..cycles {
            if self.frame_tick == 0 {
                // Get ready for a new frame draw.
                self.sink.clear();
                self.lcdc = LcdcConfig::decode(mmu.read(map::LCDC_ADDR));
                self.scroll_y = mmu.read(map::SCROLL_Y_ADDR);
            }

            // LY tracks the frame clock even during the vertical blank,
            // when no scanlines are actually being drawn.
            let scan_line = self.frame_tick / LINE_CLOCKS;
            mmu.write_silent(map::LY_ADDR, scan_line as u8);
            self.update_coincidence(&mut mmu, scan_line as u8);

            if scan_line < SCREEN_HEIGHT as u32 {
                match self.frame_tick % LINE_CLOCKS {
                    0 => {
                        self.set_mode(&mut mmu, Mode::OamScan);
                        // Start of the line: latch the per-line values.
                        self.scroll_x = mmu.read(map::SCROLL_X_ADDR);
                        self.bg_palette = decode_bg_palette(mmu.read(map::BGP_ADDR));
                    }
                    OAM_CLOCKS => {
                        self.set_mode(&mut mmu, Mode::VramTransfer);
                        self.cache_bg_tiles(&mmu);
                    }
                    DRAW_CLOCKS => {
                        self.set_mode(&mut mmu, Mode::HBlank);
                        self.draw_scan_line(&mmu, scan_line);
                    }
                    _ => {}
                }
            } else {
                self.set_mode(&mut mmu, Mode::VBlank);

                if self.frame_tick == VBLANK_START {
                    // The frame just finished drawing.
                    let unmasked = mmu.read(map::IE_ADDR) & Interrupt::VBlank.mask() != 0;
                    if self.interrupts.borrow().enabled() && unmasked {
                        mmu.flag_interrupt(Interrupt::VBlank);
                    }
                    log::debug!(
                        "vblank start, IF={:#04x} IE={:#04x}",
                        mmu.read(map::IF_ADDR),
                        mmu.read(map::IE_ADDR)
                    );
                    self.sink.present();
                }
            }

            self.refresh_stat_line(&mut mmu);

            self.frame_tick += 1;
            if self.frame_tick == FRAME_CLOCKS {
                self.frame_tick = 0;
            }
        }
    }

    /// Draw the background pixels of one scanline into the sink.
    fn draw_scan_line(&mut self, mmu: &Mmu, line: u32) {
        for x in 0..SCREEN_WIDTH as u32 {
            let color = if self.lcdc.bg_on {
                // Coordinates relative to the background plane, which wraps
                // at 256 pixels in both directions.
                let bg_x = (x as u8).wrapping_add(self.scroll_x);
                let bg_y = (line as u8).wrapping_add(self.scroll_y);

                let tile_offset = (bg_y as u16 / 8) * BG_WIDTH_TILES + bg_x as u16 / 8;
                let tile_id = mmu.read(self.lcdc.bg_tile_map + tile_offset);

                let dots = &self.tiles[tile_id as usize];
                let dot = dots[(bg_y as usize % 8) * 8 + bg_x as usize % 8];
                self.bg_palette[dot as usize]
            } else {
                Color::WHITE
            };
            self.sink.draw_point(x, line, color);
        }
    }

    /// Decode all 256 tiles of the active background data table.
    fn cache_bg_tiles(&mut self, mmu: &Mmu) {
        for id in 0..=0xFFu8 {
            let data_addr = if self.lcdc.tile_data_unsigned {
                map::TILE_DATA_UNSIGNED + id as u16 * TILE_BYTES
            } else {
                // Tile indexes into this table are signed, from -128 to 127.
                (map::TILE_DATA_SIGNED as i32 + (id as i8 as i32) * TILE_BYTES as i32) as u16
            };

            let dots = &mut self.tiles[id as usize];
            for row in 0..8u16 {
                let lower = mmu.read(data_addr + row * 2);
                let upper = mmu.read(data_addr + row * 2 + 1);
                dots[row as usize * 8..row as usize * 8 + 8]
                    .copy_from_slice(&decode_tile_row(lower, upper));
            }
        }
    }

    /// Publish the controller mode in STAT bits 0-1.
    fn set_mode(&mut self, mmu: &mut Mmu, mode: Mode) {
        let stat = mmu.read(map::STAT_ADDR);
        mmu.write_silent(map::STAT_ADDR, (stat & 0xFC) | mode as u8);
    }

    /// Publish the LY == LYC comparison in STAT bit 2.
    fn update_coincidence(&mut self, mmu: &mut Mmu, ly: u8) {
        let lyc = mmu.read(map::LYC_ADDR);
        let stat = mmu.read(map::STAT_ADDR);
        let stat = if ly == lyc {
            stat | 0x04
        } else {
            stat & !0x04
        };
        mmu.write_silent(map::STAT_ADDR, stat);
    }

    /// Recompute the STAT interrupt line and flag the STAT interrupt on its
    /// rising edge.
    ///
    /// The line is the logical OR of the sources enabled in STAT bits 3-6
    /// against the current mode and coincidence state.
    fn refresh_stat_line(&mut self, mmu: &mut Mmu) {
        let stat = mmu.read(map::STAT_ADDR);
        let mode = stat & 0x03;
        let coincidence = stat & 0x04 != 0;

        let line = (stat & 0x40 != 0 && coincidence)
            || (stat & 0x20 != 0 && mode == Mode::OamScan as u8)
            || (stat & 0x10 != 0 && mode == Mode::VBlank as u8)
            || (stat & 0x08 != 0 && mode == Mode::HBlank as u8);

        if !self.stat_line && line {
            let unmasked = mmu.read(map::IE_ADDR) & Interrupt::Stat.mask() != 0;
            if self.interrupts.borrow().enabled() && unmasked {
                mmu.flag_interrupt(Interrupt::Stat);
            }
        }
        self.stat_line = line;
    }
}

/// Display configuration decoded from the LCDC register.
#[derive(Copy, Clone)]
struct LcdcConfig {
    /// Whether the LCD is operational at all.
    lcd_on: bool,
    /// Tile map consulted for the window layer.
    #[allow(dead_code)] // window rendering is not wired into the scanline pass yet
    window_tile_map: u16,
    #[allow(dead_code)]
    window_on: bool,
    /// Whether tile data comes from the unsigned table at 0x8000 rather
    /// than the signed table around 0x9000. Window and background always
    /// share this choice.
    tile_data_unsigned: bool,
    /// Tile map consulted for the background layer.
    bg_tile_map: u16,
    #[allow(dead_code)] // sprite rendering is not wired into the scanline pass yet
    sprite_size: SpriteSize,
    #[allow(dead_code)]
    sprites_on: bool,
    /// Whether the background layer is displayed.
    bg_on: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum SpriteSize {
    Size8x8,
    Size8x16,
}

impl LcdcConfig {
    fn decode(lcdc: u8) -> LcdcConfig {
        LcdcConfig {
            lcd_on: lcdc & 0x80 != 0,
            window_tile_map: if lcdc & 0x40 != 0 {
                map::TILE_MAP_1
            } else {
                map::TILE_MAP_0
            },
            window_on: lcdc & 0x20 != 0,
            tile_data_unsigned: lcdc & 0x10 != 0,
            bg_tile_map: if lcdc & 0x08 != 0 {
                map::TILE_MAP_1
            } else {
                map::TILE_MAP_0
            },
            sprite_size: if lcdc & 0x04 != 0 {
                SpriteSize::Size8x16
            } else {
                SpriteSize::Size8x8
            },
            sprites_on: lcdc & 0x02 != 0,
            bg_on: lcdc & 0x01 != 0,
        }
    }
}

/// Expand one two-byte tile row into its eight dot codes.
///
/// Each pixel combines one bit from each byte: the second byte supplies the
/// high bit of the dot code, the first the low bit, most significant bit
/// leftmost.
fn decode_tile_row(lower: u8, upper: u8) -> [u8; 8] {
    let mut row = [0u8; 8];
    for (col, dot) in row.iter_mut().enumerate() {
        let bit = 7 - col;
        *dot = (((upper >> bit) & 1) << 1) | ((lower >> bit) & 1);
    }
    row
}

/// Decode BGP into a dot-code -> color table.
fn decode_bg_palette(mut bgp: u8) -> [Color; 4] {
    let mut palette = [SHADES[0]; 4];
    for entry in palette.iter_mut() {
        *entry = SHADES[((bgp & 0xC0) >> 6) as usize];
        bgp <<= 2;
    }
    palette
}
