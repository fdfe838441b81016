use tetrinet::core::params::table_from_percentages;
use tetrinet::core::pieces::{color, get_shape, random_piece, rotation_count, rotations};
use tetrinet::core::SimpleRng;
use tetrinet::types::PieceKind;

#[test]
fn test_rotation_state_counts() {
    assert_eq!(rotation_count(PieceKind::I), 2);
    assert_eq!(rotation_count(PieceKind::O), 1);
    assert_eq!(rotation_count(PieceKind::S), 2);
    assert_eq!(rotation_count(PieceKind::Z), 2);
    assert_eq!(rotation_count(PieceKind::J), 4);
    assert_eq!(rotation_count(PieceKind::L), 4);
    assert_eq!(rotation_count(PieceKind::T), 4);
}

#[test]
fn test_rotation_index_wraps() {
    for kind in PieceKind::ALL {
        let n = rotation_count(kind);
        for r in 0..n {
            assert_eq!(get_shape(kind, r), get_shape(kind, r + n));
        }
    }
}

#[test]
fn test_every_state_has_four_distinct_cells() {
    for kind in PieceKind::ALL {
        for shape in rotations(kind) {
            for (i, a) in shape.iter().enumerate() {
                assert!(shape[i + 1..].iter().all(|b| b != a), "{:?}", kind);
            }
        }
    }
}

#[test]
fn test_colors_in_palette() {
    for kind in PieceKind::ALL {
        assert!((1..=5).contains(&color(kind)));
    }
}

#[test]
fn test_random_piece_follows_table() {
    let table = table_from_percentages(&[0, 0, 0, 0, 0, 0, 100]);
    let mut rng = SimpleRng::new(9);
    for _ in 0..50 {
        assert_eq!(random_piece(&table, &mut rng), PieceKind::T);
    }
}
