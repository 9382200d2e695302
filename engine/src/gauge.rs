pub const DEFAULT_MAX_HP: i32 = 50;
pub const DEFAULT_BAR_WIDTH: usize = 10;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Fixed-width HP gauge followed by `shown/max`. Negative HP is shown as 0.
pub fn render_hp_bar(current: i32, max: i32, width: usize) -> String {
    let shown = current.max(0);
    let filled = if max > 0 {
        let clamped = i64::from(current.clamp(0, max));
        (clamped * width as i64 / i64::from(max)) as usize
    } else {
        0
    };
    let mut bar = String::with_capacity(width * FILLED.len_utf8() + 16);
    bar.extend(std::iter::repeat_n(FILLED, filled));
    bar.extend(std::iter::repeat_n(EMPTY, width - filled));
    format!("{} {}/{}", bar, shown, max)
}
