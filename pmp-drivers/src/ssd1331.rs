//! Command layer for the Solomon Systech SSD1331 96x64 RGB OLED controller.
//!
//! Only the command interface is used: the controller's graphic acceleration commands draw
//! rectangles and lines directly into display RAM, so nothing is buffered on our side.


pub const WIDTH: u8 = 96;
pub const HEIGHT: u8 = 64;


pub const CMD_DRAW_LINE: u8 = 0x21;
pub const CMD_DRAW_RECTANGLE: u8 = 0x22;
pub const CMD_CLEAR: u8 = 0x25;
pub const CMD_FILL: u8 = 0x26;
pub const CMD_SET_COLUMN: u8 = 0x15;
pub const CMD_SET_ROW: u8 = 0x75;
pub const CMD_CONTRAST_A: u8 = 0x81;
pub const CMD_CONTRAST_B: u8 = 0x82;
pub const CMD_CONTRAST_C: u8 = 0x83;
pub const CMD_MASTER_CURRENT: u8 = 0x87;
pub const CMD_PRECHARGE_A: u8 = 0x8A;
pub const CMD_PRECHARGE_B: u8 = 0x8B;
pub const CMD_PRECHARGE_C: u8 = 0x8C;
pub const CMD_SET_REMAP: u8 = 0xA0;
pub const CMD_START_LINE: u8 = 0xA1;
pub const CMD_DISPLAY_OFFSET: u8 = 0xA2;
pub const CMD_NORMAL_DISPLAY: u8 = 0xA4;
pub const CMD_DISPLAY_ALL_ON: u8 = 0xA5;
pub const CMD_DISPLAY_ALL_OFF: u8 = 0xA6;
pub const CMD_INVERT_DISPLAY: u8 = 0xA7;
pub const CMD_SET_MULTIPLEX: u8 = 0xA8;
pub const CMD_SET_MASTER: u8 = 0xAD;
pub const CMD_DISPLAY_OFF: u8 = 0xAE;
pub const CMD_DISPLAY_ON: u8 = 0xAF;
pub const CMD_POWER_MODE: u8 = 0xB0;
pub const CMD_PRECHARGE: u8 = 0xB1;
pub const CMD_CLOCK_DIV: u8 = 0xB3;
pub const CMD_PRECHARGE_LEVEL: u8 = 0xBB;
pub const CMD_VCOMH: u8 = 0xBE;


/// Power-up sequence, one command (with its arguments) per entry.
const INIT_SEQUENCE: [&[u8]; 20] = [
    &[CMD_DISPLAY_OFF],
    &[CMD_SET_REMAP, 0x72], // RGB colour order, COM split odd/even
    &[CMD_START_LINE, 0x00],
    &[CMD_DISPLAY_OFFSET, 0x00],
    &[CMD_NORMAL_DISPLAY],
    &[CMD_SET_MULTIPLEX, 0x3F], // 1/64 duty
    &[CMD_SET_MASTER, 0x8E], // external VCC
    &[CMD_POWER_MODE, 0x0B], // power save off
    &[CMD_PRECHARGE, 0x31],
    &[CMD_CLOCK_DIV, 0xF0], // 7:4 = oscillator frequency, 3:0 = divide ratio - 1
    &[CMD_PRECHARGE_A, 0x64],
    &[CMD_PRECHARGE_B, 0x78],
    &[CMD_PRECHARGE_C, 0x64],
    &[CMD_PRECHARGE_LEVEL, 0x3A],
    &[CMD_VCOMH, 0x3E],
    &[CMD_MASTER_CURRENT, 0x0F],
    &[CMD_CONTRAST_A, 0x91],
    &[CMD_CONTRAST_B, 0xFF],
    &[CMD_CONTRAST_C, 0x7D],
    &[CMD_DISPLAY_ON],
];


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DisplayError {
    /// The SPI transfer did not complete.
    Bus,

    /// Coordinates outside the panel.
    OutOfBounds,
}


/// The wires between the microcontroller and the controller.
pub trait DisplayBus {
    /// Sends `bytes` with D/C low (command mode) inside one chip-select frame.
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), DisplayError>;

    /// Pulses the reset line and waits until the controller is ready again.
    fn reset(&mut self) -> Result<(), DisplayError>;
}


/// A colour in the controller's native 6/6/6-bit-per-channel range (values are 0..=63).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}
impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(0x3F, 0, 0);
    pub const GREEN: Self = Self::new(0, 0x3F, 0);
    pub const BLUE: Self = Self::new(0, 0, 0x3F);
    pub const WHITE: Self = Self::new(0x3F, 0x3F, 0x3F);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Colour bytes in the order the drawing commands expect them (C, B, A).
    pub const fn to_command_bytes(&self) -> [u8; 3] {
        [self.blue, self.green, self.red]
    }
}


/// A rectangle in panel coordinates, both corners inclusive.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rect {
    start_column: u8,
    start_row: u8,
    end_column: u8,
    end_row: u8,
}
impl Rect {
    pub const FULL_PANEL: Self = Self {
        start_column: 0,
        start_row: 0,
        end_column: WIDTH - 1,
        end_row: HEIGHT - 1,
    };

    pub const fn new(start_column: u8, start_row: u8, end_column: u8, end_row: u8) -> Option<Self> {
        if start_column > end_column || start_row > end_row {
            None
        } else if end_column >= WIDTH || end_row >= HEIGHT {
            None
        } else {
            Some(Self { start_column, start_row, end_column, end_row })
        }
    }

    pub const fn start_column(&self) -> u8 { self.start_column }
    pub const fn start_row(&self) -> u8 { self.start_row }
    pub const fn end_column(&self) -> u8 { self.end_column }
    pub const fn end_row(&self) -> u8 { self.end_row }
}


#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Point {
    pub column: u8,
    pub row: u8,
}
impl Point {
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }

    const fn is_on_panel(&self) -> bool {
        self.column < WIDTH && self.row < HEIGHT
    }
}


pub struct Ssd1331<D> {
    bus: D,
}
impl<D: DisplayBus> Ssd1331<D> {
    pub fn new(bus: D) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &D { &self.bus }

    pub fn into_bus(self) -> D { self.bus }

    /// Resets the controller, replays the power-up sequence, enables filled rectangles and
    /// blanks the panel.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.bus.reset()?;
        for command in INIT_SEQUENCE {
            self.bus.write_command(command)?;
        }
        self.set_fill(true)?;
        self.clear(Rect::FULL_PANEL)
    }

    /// Decides whether [`fill_rect`](Self::fill_rect) paints the inside of the rectangle.
    pub fn set_fill(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.bus.write_command(&[CMD_FILL, if enabled { 0x01 } else { 0x00 }])
    }

    pub fn clear(&mut self, rect: Rect) -> Result<(), DisplayError> {
        self.bus.write_command(&[
            CMD_CLEAR,
            rect.start_column, rect.start_row,
            rect.end_column, rect.end_row,
        ])
    }

    /// Draws `rect` with an `outline` border and, if filling is enabled, a `fill` interior.
    pub fn fill_rect(&mut self, rect: Rect, outline: Color, fill: Color) -> Result<(), DisplayError> {
        let outline_bytes = outline.to_command_bytes();
        let fill_bytes = fill.to_command_bytes();
        self.bus.write_command(&[
            CMD_DRAW_RECTANGLE,
            rect.start_column, rect.start_row,
            rect.end_column, rect.end_row,
            outline_bytes[0], outline_bytes[1], outline_bytes[2],
            fill_bytes[0], fill_bytes[1], fill_bytes[2],
        ])
    }

    pub fn draw_line(&mut self, from: Point, to: Point, color: Color) -> Result<(), DisplayError> {
        if !from.is_on_panel() || !to.is_on_panel() {
            return Err(DisplayError::OutOfBounds);
        }
        let color_bytes = color.to_command_bytes();
        self.bus.write_command(&[
            CMD_DRAW_LINE,
            from.column, from.row,
            to.column, to.row,
            color_bytes[0], color_bytes[1], color_bytes[2],
        ])
    }

    pub fn set_display_on(&mut self, on: bool) -> Result<(), DisplayError> {
        self.bus.write_command(&[if on { CMD_DISPLAY_ON } else { CMD_DISPLAY_OFF }])
    }

    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), DisplayError> {
        self.bus.write_command(&[if inverted { CMD_INVERT_DISPLAY } else { CMD_NORMAL_DISPLAY }])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DisplayOp, MockDisplayBus};

    #[test]
    fn test_rect_bounds() {
        assert!(Rect::new(0, 0, 95, 63).is_some());
        assert_eq!(Rect::new(0, 0, 95, 63), Some(Rect::FULL_PANEL));
        assert!(Rect::new(0, 0, 96, 63).is_none());
        assert!(Rect::new(0, 0, 95, 64).is_none());
        assert!(Rect::new(10, 0, 5, 8).is_none());
        assert!(Rect::new(0, 9, 5, 8).is_none());
        assert!(Rect::new(3, 3, 3, 3).is_some());
    }

    #[test]
    fn test_init_sequence() {
        let mut display = Ssd1331::new(MockDisplayBus::new());
        display.init().unwrap();

        let bus = display.into_bus();
        assert_eq!(bus.ops[0], DisplayOp::Reset);

        let commands = bus.commands();
        assert_eq!(commands.len(), INIT_SEQUENCE.len() + 2);
        assert_eq!(commands[0], vec![CMD_DISPLAY_OFF]);
        assert_eq!(commands[1], vec![CMD_SET_REMAP, 0x72]);
        assert_eq!(commands[12], vec![CMD_PRECHARGE_C, 0x64]);
        assert_eq!(commands[19], vec![CMD_DISPLAY_ON]);
        assert_eq!(commands[20], vec![CMD_FILL, 0x01]);
        assert_eq!(commands[21], vec![CMD_CLEAR, 0x00, 0x00, 0x5F, 0x3F]);
    }

    #[test]
    fn test_init_stops_on_failure() {
        let mut bus = MockDisplayBus::new();
        bus.fail_after = Some(3);
        let mut display = Ssd1331::new(bus);
        assert_eq!(display.init(), Err(DisplayError::Bus));
        assert_eq!(display.bus().commands().len(), 3);
    }

    #[test]
    fn test_fill_rect() {
        let mut display = Ssd1331::new(MockDisplayBus::new());
        let rect = Rect::new(1, 0, 5, 1).unwrap();
        display.fill_rect(rect, Color::GREEN, Color::GREEN).unwrap();
        display.fill_rect(rect, Color::new(1, 2, 3), Color::new(4, 5, 6)).unwrap();
        assert_eq!(display.bus().commands(), vec![
            vec![CMD_DRAW_RECTANGLE, 1, 0, 5, 1, 0x00, 0x3F, 0x00, 0x00, 0x3F, 0x00],
            vec![CMD_DRAW_RECTANGLE, 1, 0, 5, 1, 3, 2, 1, 6, 5, 4],
        ]);
    }

    #[test]
    fn test_draw_line() {
        let mut display = Ssd1331::new(MockDisplayBus::new());
        display.draw_line(Point::new(0, 0), Point::new(95, 63), Color::WHITE).unwrap();
        assert_eq!(
            display.draw_line(Point::new(0, 0), Point::new(96, 0), Color::WHITE),
            Err(DisplayError::OutOfBounds),
        );
        assert_eq!(display.bus().commands(), vec![
            vec![CMD_DRAW_LINE, 0, 0, 95, 63, 0x3F, 0x3F, 0x3F],
        ]);
    }
}
