use winit::event::VirtualKeyCode;

/// Host keys laid out like the hex keypad:
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// Q W E R   ->   4 5 6 D
/// A S D F        7 8 9 E
/// Z X C V        A 0 B F
/// ```
///
/// Indexed by keypad value.
pub const KEYPAD: [VirtualKeyCode; 16] = [
    VirtualKeyCode::X,    // 0
    VirtualKeyCode::Key1, // 1
    VirtualKeyCode::Key2, // 2
    VirtualKeyCode::Key3, // 3
    VirtualKeyCode::Q,    // 4
    VirtualKeyCode::W,    // 5
    VirtualKeyCode::E,    // 6
    VirtualKeyCode::A,    // 7
    VirtualKeyCode::S,    // 8
    VirtualKeyCode::D,    // 9
    VirtualKeyCode::Z,    // A
    VirtualKeyCode::C,    // B
    VirtualKeyCode::Key4, // C
    VirtualKeyCode::R,    // D
    VirtualKeyCode::F,    // E
    VirtualKeyCode::V,    // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(KEYPAD[0x1], VirtualKeyCode::Key1);
        assert_eq!(KEYPAD[0xC], VirtualKeyCode::Key4);
        assert_eq!(KEYPAD[0x0], VirtualKeyCode::X);
        assert_eq!(KEYPAD[0xF], VirtualKeyCode::V);
        assert!(!KEYPAD.contains(&VirtualKeyCode::Space));
    }

    #[test]
    fn every_key_is_distinct() {
        for (i, key) in KEYPAD.iter().enumerate() {
            assert!(!KEYPAD[i + 1..].contains(key), "{key:?} mapped twice");
        }
    }
}
