//! On-screen piano keyboard.
//!
//! One button per key in the keyboard range. Sounding notes are lit; clicking
//! a key produces the message built by `on_press`.

use std::collections::HashSet;

use iced::widget::{button, container, row, text};
use iced::{Background, Border, Color, Element, Length};

use eartrainer::midi::{is_black_key, note_name};

const KEY_WIDTH: f32 = 38.0;
const WHITE_KEY_HEIGHT: f32 = 140.0;
const BLACK_KEY_HEIGHT: f32 = 90.0;

fn key_colors(black: bool, lit: bool) -> (Color, Color) {
    match (black, lit) {
        (_, true) => (Color::from_rgb(0.3, 0.6, 0.9), Color::WHITE),
        (true, false) => (Color::from_rgb(0.05, 0.05, 0.05), Color::from_rgb(0.7, 0.7, 0.7)),
        (false, false) => (Color::from_rgb(0.95, 0.95, 0.95), Color::from_rgb(0.2, 0.2, 0.2)),
    }
}

pub fn view_piano<'a, M: 'a + Clone>(
    keys: impl IntoIterator<Item = u8>,
    sounding: &HashSet<u8>,
    on_press: impl Fn(u8) -> M,
) -> Element<'a, M> {
    let buttons: Vec<Element<'a, M>> = keys
        .into_iter()
        .map(|note| {
            let black = is_black_key(note);
            let (bg, fg) = key_colors(black, sounding.contains(&note));
            let height = if black {
                BLACK_KEY_HEIGHT
            } else {
                WHITE_KEY_HEIGHT
            };

            button(text(note_name(note)).size(10).color(fg))
                .on_press(on_press(note))
                .width(Length::Fixed(KEY_WIDTH))
                .height(Length::Fixed(height))
                .padding([4, 2])
                .style(move |_theme, _status| button::Style {
                    background: Some(Background::Color(bg)),
                    text_color: fg,
                    border: Border::default()
                        .rounded(2)
                        .color(Color::from_rgb(0.4, 0.4, 0.4))
                        .width(1),
                    ..Default::default()
                })
                .into()
        })
        .collect();

    container(row(buttons).spacing(1)).padding(8).into()
}
