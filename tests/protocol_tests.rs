use tetrinet::core::protocol::{
    decode_field, encode_field, encode_field_full, is_partial, login_encode, login_frame,
};
use tetrinet::core::{Board, GameParams, ServerMessage};
use tetrinet::types::{Block, Special, BOARD_HEIGHT, BOARD_WIDTH};

#[test]
fn test_login_golden() {
    assert_eq!(
        login_encode("tetrisstart su11y 1.13"),
        "80C210B3134A85CF71E46FD4C1034046428D95F115709B"
    );
    assert_eq!(login_frame("su11y"), login_encode("tetrisstart su11y 1.13"));
}

#[test]
fn test_full_encoding_roundtrip_any_board() {
    let specials = Special::QUEUEABLE;
    let mut board = Board::new();
    for y in 0..BOARD_HEIGHT as i8 {
        for x in 0..BOARD_WIDTH as i8 {
            let n = (x as usize * 7 + y as usize * 3) % 17;
            let cell = match n {
                0..=4 => None,
                5..=9 => Some(Block::new(n as u8 - 4)),
                _ => {
                    let mut block = Block::new((x + y) as u8 % 5 + 1);
                    block.tag(specials[n % specials.len()]);
                    Some(block)
                }
            };
            board.set(x, y, cell);
        }
    }

    let encoded = encode_field_full(&board);
    assert_eq!(encoded.len(), 264);
    let mut decoded = Board::new();
    decode_field(&mut decoded, &encoded).unwrap();
    assert_eq!(decoded, board);
}

#[test]
fn test_small_change_goes_out_as_delta() {
    let prev = Board::new();
    let mut next = prev.clone();
    next.set(0, 21, Some(Block::new(4)));
    next.set(1, 21, Some(Block::with_special(Special::Gravity)));

    let field = encode_field(Some(&prev), &next).unwrap();
    assert!(is_partial(&field));
    let mut peer = prev.clone();
    decode_field(&mut peer, &field).unwrap();
    assert_eq!(peer, next);

    assert_eq!(encode_field(Some(&next), &next), None);
}

#[test]
fn test_bad_field_leaves_board_untouched() {
    let mut board = Board::new();
    board.set(2, 2, Some(Block::new(2)));
    let before = board.clone();
    let mut bad = "0".repeat(263);
    bad.push('z');
    assert!(decode_field(&mut board, &bad).is_err());
    assert!(decode_field(&mut board, "000").is_err());
    assert_eq!(board, before);
}

#[test]
fn test_newgame_and_fast_marker() {
    let rules = GameParams::default().rules_message();
    match ServerMessage::parse(&rules).unwrap() {
        ServerMessage::NewGame(params) => {
            assert!(!params.fast);
            assert_eq!(*params, GameParams::default());
        }
        other => panic!("unexpected {:?}", other),
    }

    let fast = rules.replacen("newgame", "*******", 1);
    match ServerMessage::parse(&fast).unwrap() {
        ServerMessage::NewGame(params) => assert!(params.fast),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_malformed_messages_are_errors() {
    assert!(ServerMessage::parse("").is_err());
    assert!(ServerMessage::parse("frobnicate 1").is_err());
    assert!(ServerMessage::parse("playernum x").is_err());
    assert!(ServerMessage::parse("sb 1").is_err());
    assert!(ServerMessage::parse("newgame 0 1 2").is_err());
}

#[test]
fn test_special_message_parse() {
    assert_eq!(
        ServerMessage::parse("sb 0 cs2 4").unwrap(),
        ServerMessage::SpecialUsed {
            target: 0,
            special: Special::ClassicAddLine(2),
            source: 4,
        }
    );
    assert_eq!(
        ServerMessage::parse("sb 3 o 1").unwrap(),
        ServerMessage::SpecialUsed {
            target: 3,
            special: Special::BlockBomb,
            source: 1,
        }
    );
}
