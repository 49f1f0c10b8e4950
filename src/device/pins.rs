//! GPIO | Function          | Notes
//! -----+-------------------+-----------------------------------
//!  25  | ADC - Tile        | Voltage divider, one level per tile
//!  32  | ADC - Row         | Voltage divider, row within a tile
//!  33  | ADC - Column      | Voltage divider, column within a tile
//!  27  | Encoder A         | Sensor proxy only
//!  14  | Encoder B         | Sensor proxy only

// ----- Position sensing (all proxies) -----
pub const TILE_PIN: u8 = 25;
pub const ROW_PIN: u8 = 32;
pub const COL_PIN: u8 = 33;

// ----- Rotary encoder (sensor proxy) -----
pub const ENCODER_PIN_A: u8 = 27;
pub const ENCODER_PIN_B: u8 = 14;

// ----- Round display (sensor proxy) -----
pub const SCREEN_WIDTH: u16 = 240;
pub const SCREEN_HEIGHT: u16 = 240;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_pins_are_distinct() {
        assert_ne!(TILE_PIN, ROW_PIN);
        assert_ne!(ROW_PIN, COL_PIN);
        assert_ne!(TILE_PIN, COL_PIN);
    }

    #[test]
    fn test_encoder_does_not_share_position_pins() {
        for pin in [ENCODER_PIN_A, ENCODER_PIN_B] {
            assert!(![TILE_PIN, ROW_PIN, COL_PIN].contains(&pin));
        }
    }
}
