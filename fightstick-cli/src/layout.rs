use fightstick_core::report;
use fightstick_core::{Key, MATRIX_COLS, MATRIX_ROWS};

/// Print the physical key table: which matrix intersection drives which
/// control, and what each control does to the report.
pub fn print_layout() {
    println!("matrix {}x{} (row, col) -> control\n", MATRIX_ROWS, MATRIX_COLS);

    // Grid view, one line per row
    print!("r/c ");
    for col in 0..MATRIX_COLS {
        print!("{:>8}", col);
    }
    println!();

    for row in 0..MATRIX_ROWS {
        print!("{:>3} ", row);
        for col in 0..MATRIX_COLS {
            let name = Key::ALL
                .iter()
                .find(|k| k.position() == (row, col))
                .map(|k| k.name())
                .unwrap_or("-");
            print!("{:>8}", name);
        }
        println!();
    }

    // Effect of each control, in report evaluation order
    println!();
    for key in Key::ALL {
        let (row, col) = key.position();
        let mask = report::button_mask(key);
        let effect = match key {
            Key::Up => "LY = min".to_string(),
            Key::Down => "LY = max".to_string(),
            Key::Left => "LX = min".to_string(),
            Key::Right => "LX = max".to_string(),
            _ => format!("button 0x{:04X}", mask),
        };
        println!("{:>8}  ({}, {})  {}", key.name(), row, col, effect);
    }
}
