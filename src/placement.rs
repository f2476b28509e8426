/// Viewport-relative box, as reported by the host for a formula or button
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Used until the button has been laid out and reports a real size
const FALLBACK_BUTTON: Size = Size {
    width: 120.0,
    height: 40.0,
};

/// Where to put the copy button for a formula occupying `formula`.
///
/// The button is centred above the formula and kept `padding` away from the viewport's left and
/// right edges. If there is no room above, it goes below instead.
pub fn place_button(
    formula: Rect,
    button: Size,
    viewport_width: f64,
    offset: f64,
    padding: f64,
) -> Position {
    let width = if button.width > 0.0 {
        button.width
    } else {
        FALLBACK_BUTTON.width
    };
    let height = if button.height > 0.0 {
        button.height
    } else {
        FALLBACK_BUTTON.height
    };

    let centred = formula.x + (formula.width - width) / 2.0;
    // `max` last: a viewport narrower than the button still keeps the left padding
    let x = centred.min(viewport_width - width - padding).max(padding);

    let above = formula.y - height - offset;
    let y = if above < padding {
        formula.bottom() + offset
    } else {
        above
    };
    Position { x, y }
}
