//! C64 keyboard matrix.
//!
//! The 64 keys sit on an 8×8 matrix wired to CIA #1. The KERNAL drives one
//! port A line low at a time ($DC00) and reads port B ($DC01): a pressed key
//! connects its port A line (matrix row) to its port B line (column), so
//! the column bit reads 0.
//!
//! ```text
//! PA\PB |  0    1    2    3    4    5    6    7
//! ------|------------------------------------------
//!   0   | DEL  RET   →   F7   F1   F3   F5   ↓
//!   1   |  3    W    A    4    Z    S    E  LSHFT
//!   2   |  5    R    D    6    C    F    T    X
//!   3   |  7    Y    G    8    B    H    U    V
//!   4   |  9    I    J    0    M    K    O    N
//!   5   |  +    P    L    -    .    :    @    ,
//!   6   |  £    *    ;  HOME RSHFT =    ↑    /
//!   7   |  1    ←  CTRL   2  SPACE  C=   Q  STOP
//! ```
//!
//! RESTORE is not on the matrix; it pulls the NMI line directly.

use std::collections::HashMap;

/// Symbolic key names, independent of any host keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Delete,
    Return,
    CursorRight,
    F7,
    F1,
    F3,
    F5,
    CursorDown,
    Num3,
    W,
    A,
    Num4,
    Z,
    S,
    E,
    LeftShift,
    Num5,
    R,
    D,
    Num6,
    C,
    F,
    T,
    X,
    Num7,
    Y,
    G,
    Num8,
    B,
    H,
    U,
    V,
    Num9,
    I,
    J,
    Num0,
    M,
    K,
    O,
    N,
    Plus,
    P,
    L,
    Minus,
    Period,
    Colon,
    At,
    Comma,
    Pound,
    Asterisk,
    Semicolon,
    Home,
    RightShift,
    Equals,
    UpArrow,
    Slash,
    Num1,
    LeftArrow,
    Control,
    Num2,
    Space,
    Commodore,
    Q,
    RunStop,
    Restore,
}

/// Pressed-key state plus the lookup tables for this layout.
#[derive(Debug, Clone)]
pub struct Keyboard {
    /// One byte per port A line; bit N set means the key on port B line N
    /// is held.
    matrix: [u8; 8],
    restore: bool,
    positions: HashMap<Key, (u8, u8)>,
    names: HashMap<&'static str, Key>,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub fn new() -> Self {
        use Key::*;

        let layout: [[(Key, &'static str); 8]; 8] = [
            [
                (Delete, "DEL"),
                (Return, "RETURN"),
                (CursorRight, "CRSR_RIGHT"),
                (F7, "F7"),
                (F1, "F1"),
                (F3, "F3"),
                (F5, "F5"),
                (CursorDown, "CRSR_DOWN"),
            ],
            [
                (Num3, "3"),
                (W, "W"),
                (A, "A"),
                (Num4, "4"),
                (Z, "Z"),
                (S, "S"),
                (E, "E"),
                (LeftShift, "LSHIFT"),
            ],
            [
                (Num5, "5"),
                (R, "R"),
                (D, "D"),
                (Num6, "6"),
                (C, "C"),
                (F, "F"),
                (T, "T"),
                (X, "X"),
            ],
            [
                (Num7, "7"),
                (Y, "Y"),
                (G, "G"),
                (Num8, "8"),
                (B, "B"),
                (H, "H"),
                (U, "U"),
                (V, "V"),
            ],
            [
                (Num9, "9"),
                (I, "I"),
                (J, "J"),
                (Num0, "0"),
                (M, "M"),
                (K, "K"),
                (O, "O"),
                (N, "N"),
            ],
            [
                (Plus, "+"),
                (P, "P"),
                (L, "L"),
                (Minus, "-"),
                (Period, "."),
                (Colon, ":"),
                (At, "@"),
                (Comma, ","),
            ],
            [
                (Pound, "POUND"),
                (Asterisk, "*"),
                (Semicolon, ";"),
                (Home, "HOME"),
                (RightShift, "RSHIFT"),
                (Equals, "="),
                (UpArrow, "UP_ARROW"),
                (Slash, "/"),
            ],
            [
                (Num1, "1"),
                (LeftArrow, "LEFT_ARROW"),
                (Control, "CTRL"),
                (Num2, "2"),
                (Space, "SPACE"),
                (Commodore, "COMMODORE"),
                (Q, "Q"),
                (RunStop, "RUN_STOP"),
            ],
        ];

        let mut positions = HashMap::with_capacity(64);
        let mut names = HashMap::with_capacity(65);
        for (row, keys) in layout.iter().enumerate() {
            for (col, &(key, name)) in keys.iter().enumerate() {
                positions.insert(key, (row as u8, col as u8));
                names.insert(name, key);
            }
        }
        names.insert("RESTORE", Restore);

        Self {
            matrix: [0; 8],
            restore: false,
            positions,
            names,
        }
    }

    /// Looks a key up by its symbolic name, e.g. `"RETURN"`, `"A"`, `"F1"`.
    pub fn key_by_name(&self, name: &str) -> Option<Key> {
        self.names.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Matrix position (port A line, port B line), or `None` for RESTORE.
    pub fn position(&self, key: Key) -> Option<(u8, u8)> {
        self.positions.get(&key).copied()
    }

    pub fn press(&mut self, key: Key) {
        match self.position(key) {
            Some((row, col)) => self.matrix[row as usize] |= 1 << col,
            None => self.restore = true,
        }
    }

    pub fn release(&mut self, key: Key) {
        match self.position(key) {
            Some((row, col)) => self.matrix[row as usize] &= !(1 << col),
            None => self.restore = false,
        }
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        match self.position(key) {
            Some((row, col)) => self.matrix[row as usize] & (1 << col) != 0,
            None => self.restore,
        }
    }

    /// RESTORE held; the bus ORs this into NMI.
    pub fn restore_pressed(&self) -> bool {
        self.restore
    }

    /// Port B levels for what port A drives (both active low).
    pub fn scan_port_b(&self, port_a: u8) -> u8 {
        let mut result = 0xFF;
        for (row, &held) in self.matrix.iter().enumerate() {
            if port_a & (1 << row) == 0 {
                result &= !held;
            }
        }
        result
    }

    /// Port A levels for what port B drives. Used by programs that scan
    /// the matrix the other way round.
    pub fn scan_port_a(&self, port_b: u8) -> u8 {
        let mut result = 0xFF;
        for (row, &held) in self.matrix.iter().enumerate() {
            if held & !port_b != 0 {
                result &= !(1 << row);
            }
        }
        result
    }

    pub fn release_all(&mut self) {
        self.matrix = [0; 8];
        self.restore = false;
    }
}
