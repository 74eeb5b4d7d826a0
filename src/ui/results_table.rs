//! Results table UI component.
//!
//! Renders one row per scale degree with the note name, how often it was
//! tested and how often it was answered correctly.

use iced::widget::{column, container, row, text, Column};
use iced::{Background, Border, Color, Element, Length, Theme};

use eartrainer::midi::note_name;
use eartrainer::results::{DegreeStats, ITEMS_PER_OCTAVE};
use eartrainer::session::TestItem;

/// Column widths for consistent table layout.
const COL_DEGREE_WIDTH: f32 = 70.0;
const COL_NOTE_WIDTH: f32 = 60.0;
const COL_TESTS_WIDTH: f32 = 60.0;
const COL_CORRECT_WIDTH: f32 = 70.0;
const COL_SCORE_WIDTH: f32 = 70.0;
const ROW_HEIGHT: f32 = 26.0;

const HEADERS: [(&str, f32); 5] = [
    ("DEGREE", COL_DEGREE_WIDTH),
    ("NOTE", COL_NOTE_WIDTH),
    ("TESTS", COL_TESTS_WIDTH),
    ("CORRECT", COL_CORRECT_WIDTH),
    ("SCORE", COL_SCORE_WIDTH),
];

/// Row highlighting colors.
fn row_background(last_answer: Option<bool>, in_pool: bool) -> Color {
    match last_answer {
        Some(true) => Color::from_rgb(0.15, 0.45, 0.15),  // Green
        Some(false) => Color::from_rgb(0.5, 0.15, 0.15), // Red
        None if in_pool => Color::from_rgb(0.18, 0.18, 0.18),
        None => Color::from_rgb(0.12, 0.12, 0.12),
    }
}

fn header_color() -> Color {
    Color::from_rgb(0.7, 0.7, 0.7)
}

fn cell_color(in_pool: bool) -> Color {
    if in_pool {
        Color::from_rgb(0.9, 0.9, 0.9)
    } else {
        Color::from_rgb(0.5, 0.5, 0.5)
    }
}

fn cell<'a, M: 'a>(content: String, width: f32, color: Color) -> Element<'a, M> {
    container(text(content).size(13).color(color))
        .width(Length::Fixed(width))
        .padding([2, 8])
        .center_y(Length::Fixed(ROW_HEIGHT))
        .into()
}

fn view_table_header<'a, M: 'a>() -> Element<'a, M> {
    let cells: Vec<Element<'a, M>> = HEADERS
        .iter()
        .map(|(label, width)| cell(label.to_string(), *width, header_color()))
        .collect();

    container(row(cells).spacing(2))
        .style(|_theme: &Theme| container::Style {
            background: Some(Background::Color(Color::from_rgb(0.08, 0.08, 0.08))),
            border: Border::default().rounded(2),
            ..Default::default()
        })
        .into()
}

fn view_degree_row<'a, M: 'a>(
    degree: usize,
    note: u8,
    stats: DegreeStats,
    last_answer: Option<bool>,
    in_pool: bool,
) -> Element<'a, M> {
    let bg_color = row_background(last_answer, in_pool);
    let txt_color = cell_color(in_pool);
    let score = stats
        .score()
        .map(|s| format!("{:.0}%", s))
        .unwrap_or_else(|| "--".to_string());

    container(
        row![
            cell(degree.to_string(), COL_DEGREE_WIDTH, txt_color),
            cell(note_name(note), COL_NOTE_WIDTH, txt_color),
            cell(stats.num_tests.to_string(), COL_TESTS_WIDTH, txt_color),
            cell(stats.num_correct.to_string(), COL_CORRECT_WIDTH, txt_color),
            cell(score, COL_SCORE_WIDTH, txt_color),
        ]
        .spacing(2),
    )
    .style(move |_theme: &Theme| container::Style {
        background: Some(Background::Color(bg_color)),
        border: Border::default().rounded(2),
        ..Default::default()
    })
    .height(Length::Fixed(ROW_HEIGHT))
    .into()
}

/// Build the results table.
///
/// The row of the most recent answer is colored by whether it was correct;
/// degrees outside the configured pool are dimmed.
pub fn view_results_table<'a, M: 'a>(
    stats: &[DegreeStats; ITEMS_PER_OCTAVE],
    key_root: u8,
    pool: &[u8],
    last_item: Option<TestItem>,
) -> Element<'a, M> {
    let rows: Vec<Element<'a, M>> = stats
        .iter()
        .enumerate()
        .map(|(degree, s)| {
            let last_answer = last_item
                .filter(|item| item.test_degree as usize == degree)
                .map(|item| item.correct);
            view_degree_row(
                degree,
                key_root.saturating_add(degree as u8),
                *s,
                last_answer,
                pool.contains(&(degree as u8)),
            )
        })
        .collect();

    column![view_table_header(), Column::with_children(rows).spacing(2)]
        .spacing(4)
        .padding(8)
        .into()
}
