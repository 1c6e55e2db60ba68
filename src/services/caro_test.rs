use super::*;

const HOST: UserId = 5;
const GUEST: UserId = 3;

/// Owner pattern with no run longer than two in any direction.
fn draw_owner(row: i32, col: i32) -> UserId {
    if (col / 2 + row) % 2 == 0 { HOST } else { GUEST }
}

#[test]
fn bounds() {
    assert!(in_bounds(0, 0));
    assert!(in_bounds(14, 19));
    assert!(!in_bounds(15, 0));
    assert!(!in_bounds(0, 20));
    assert!(!in_bounds(-1, 3));
}

#[test]
fn place_rejects_taken_and_out_of_bounds_cells() {
    let mut board = Board::new();
    assert!(board.place(7, 10, HOST));
    assert!(!board.place(7, 10, GUEST));
    assert!(!board.place(15, 10, GUEST));
    assert_eq!(board.owner(7, 10), Some(HOST));
    assert_eq!(board.filled, 1);
}

#[test]
fn four_in_a_row_is_not_a_win() {
    let mut board = Board::new();
    for col in 7..11 {
        board.place(7, col, HOST);
    }
    assert!(!board.wins_at(7, 10, HOST));
}

#[test]
fn five_in_a_row_wins_in_every_direction() {
    let lines: [[(i32, i32); 5]; 4] = [
        [(7, 7), (7, 8), (7, 9), (7, 10), (7, 11)],
        [(2, 3), (3, 3), (4, 3), (5, 3), (6, 3)],
        [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)],
        [(10, 19), (11, 18), (12, 17), (13, 16), (14, 15)],
    ];
    for line in lines {
        let mut board = Board::new();
        for &(r, c) in &line {
            board.place(r, c, HOST);
        }
        // The check is inclusive of the placed cell wherever it sits in the line.
        for &(r, c) in &line {
            assert!(board.wins_at(r, c, HOST), "line {line:?} through ({r},{c})");
        }
        assert!(!board.wins_at(line[0].0, line[0].1, GUEST));
    }
}

#[test]
fn broken_line_is_not_a_win() {
    let mut board = Board::new();
    for col in [7, 8, 10, 11] {
        board.place(7, col, HOST);
    }
    board.place(7, 9, GUEST);
    assert!(!board.wins_at(7, 11, HOST));
}

#[test]
fn draw_pattern_fills_board_without_winner() {
    let mut board = Board::new();
    for row in 0..ROWS {
        for col in 0..COLS {
            assert!(board.place(row, col, draw_owner(row, col)));
        }
    }
    assert!(board.is_full());
    for row in 0..ROWS {
        for col in 0..COLS {
            let owner = draw_owner(row, col);
            assert!(!board.wins_at(row, col, owner), "unexpected win at ({row},{col})");
        }
    }
}

#[test]
fn from_moves_and_matrix() {
    let moves = vec![
        GameMove { id: 1, session_id: 1, user_id: HOST, row: 0, col: 0, move_number: 1 },
        GameMove { id: 2, session_id: 1, user_id: GUEST, row: 0, col: 1, move_number: 2 },
    ];
    let board = Board::from_moves(&moves);
    let matrix = board.matrix(HOST);
    assert_eq!(matrix.len(), 15);
    assert_eq!(matrix[0].len(), 20);
    assert_eq!(matrix[0][0], 1);
    assert_eq!(matrix[0][1], 2);
    assert_eq!(matrix[1][0], 0);
}
