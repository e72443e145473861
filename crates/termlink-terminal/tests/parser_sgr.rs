use pretty_assertions::assert_eq;
use termlink_terminal::{ColorRef, Interpreter, ScreenBuffer};

#[test]
fn parser_applies_sgr_attributes_and_colors() {
    let screen = ScreenBuffer::new(2, 10).unwrap();
    let mut interpreter = Interpreter::new();

    interpreter.feed(&screen, "\x1b[31;1mX\x1b[0mY").unwrap();

    let snapshot = screen.snapshot().unwrap();
    let x = snapshot.cell(0, 0).expect("cell (0,0)");
    assert_eq!(x.glyph, 'X');
    assert_eq!(x.foreground, ColorRef::RED);
    assert!(x.attributes.bold, "bold should be set");

    let y = snapshot.cell(0, 1).expect("cell (0,1)");
    assert_eq!(y.glyph, 'Y');
    assert_eq!(y.foreground, ColorRef::DefaultForeground);
    assert!(!y.attributes.bold, "format should be reset after SGR 0");
}

#[test]
fn parser_applies_256_color_palette() {
    let screen = ScreenBuffer::new(2, 10).unwrap();
    let mut interpreter = Interpreter::new();

    interpreter.feed(&screen, "\x1b[1;38;5;196;48;5;232mB").unwrap();

    let snapshot = screen.snapshot().unwrap();
    let cell = snapshot.cell(0, 0).unwrap();
    assert_eq!(cell.foreground, ColorRef::Indexed(196));
    assert_eq!(cell.background, ColorRef::Indexed(232));
    assert!(cell.attributes.bold);
}

#[test]
fn reverse_video_swaps_colors_on_written_cells_only() {
    let screen = ScreenBuffer::new(2, 10).unwrap();
    let mut interpreter = Interpreter::new();

    interpreter.feed(&screen, "\x1b[33;44;7mR\x1b[27mN").unwrap();

    let snapshot = screen.snapshot().unwrap();
    let reversed = snapshot.cell(0, 0).unwrap();
    assert_eq!(reversed.foreground, ColorRef::BLUE);
    assert_eq!(reversed.background, ColorRef::YELLOW);

    let normal = snapshot.cell(0, 1).unwrap();
    assert_eq!(normal.foreground, ColorRef::YELLOW);
    assert_eq!(normal.background, ColorRef::BLUE);
}

#[test]
fn hello_world_scenario() {
    let screen = ScreenBuffer::new(24, 80).unwrap();
    let mut interpreter = Interpreter::new();

    interpreter
        .feed(&screen, "\r\nHello\x1b[31mWorld\x1b[0m\r\n")
        .unwrap();

    let snapshot = screen.snapshot().unwrap();
    assert_eq!(snapshot.row_text(0), "");
    assert_eq!(snapshot.row_text(1), "HelloWorld");
    for column in 0..5 {
        assert_eq!(
            snapshot.cell(1, column).unwrap().foreground,
            ColorRef::DefaultForeground
        );
    }
    for column in 5..10 {
        assert_eq!(snapshot.cell(1, column).unwrap().foreground, ColorRef::RED);
    }
    assert_eq!((snapshot.cursor_row, snapshot.cursor_column), (2, 0));
}
