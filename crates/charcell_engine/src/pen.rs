//! The pen: current drawing attributes applied to newly placed glyphs.

use charcell_parser_core::{csi_arg, csi_arg_has_more, csi_arg_or};

use crate::{Baseline, CellAttrs, Color, Palette, PenAttr, PenValue, Underline};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pen {
    pub attrs: CellAttrs,
    pub fg: Color,
    pub bg: Color,
}

impl Pen {
    pub fn reset(&mut self, palette: &Palette) {
        self.attrs = CellAttrs::default();
        self.fg = palette.default_fg();
        self.bg = palette.default_bg();
    }

    fn underline_value(style: Underline) -> i32 {
        match style {
            Underline::Off => 0,
            Underline::Single => 1,
            Underline::Double => 2,
            Underline::Curly => 3,
        }
    }

    fn baseline_value(baseline: Baseline) -> i32 {
        match baseline {
            Baseline::Normal => 0,
            Baseline::Raise => 1,
            Baseline::Lower => 2,
        }
    }

    fn emit_all(&self, emit: &mut dyn FnMut(PenAttr, PenValue)) {
        emit(PenAttr::Bold, PenValue::Bool(self.attrs.is_bold()));
        emit(
            PenAttr::Underline,
            PenValue::Int(Self::underline_value(self.attrs.underline)),
        );
        emit(PenAttr::Italic, PenValue::Bool(self.attrs.is_italic()));
        emit(PenAttr::Blink, PenValue::Bool(self.attrs.is_blinking()));
        emit(PenAttr::Reverse, PenValue::Bool(self.attrs.is_reverse()));
        emit(PenAttr::Conceal, PenValue::Bool(self.attrs.is_concealed()));
        emit(PenAttr::Strike, PenValue::Bool(self.attrs.is_crossed_out()));
        emit(PenAttr::Font, PenValue::Int(i32::from(self.attrs.font)));
        emit(PenAttr::Small, PenValue::Bool(self.attrs.is_small()));
        emit(
            PenAttr::Baseline,
            PenValue::Int(Self::baseline_value(self.attrs.baseline)),
        );
        emit(PenAttr::Foreground, PenValue::Color(self.fg));
        emit(PenAttr::Background, PenValue::Color(self.bg));
    }

    /// Apply one SGR parameter list to the pen, reporting every changed
    /// attribute through `emit`.
    pub(crate) fn apply_sgr(
        &mut self,
        args: &[i64],
        palette: &Palette,
        bold_highbright: bool,
        emit: &mut dyn FnMut(PenAttr, PenValue),
    ) {
        let mut i = 0;
        while i < args.len() {
            let code = csi_arg_or(args[i], 0);
            match code {
                0 => {
                    self.reset(palette);
                    self.emit_all(emit);
                }
                1 => {
                    self.attrs.set_bold(true);
                    emit(PenAttr::Bold, PenValue::Bool(true));
                    if bold_highbright {
                        if let Some(idx) = self.fg.indexed() {
                            if idx < 8 && !self.fg.is_default_fg() {
                                self.fg = Color::index(idx + 8);
                                emit(PenAttr::Foreground, PenValue::Color(self.fg));
                            }
                        }
                    }
                }
                3 => {
                    self.attrs.set_italic(true);
                    emit(PenAttr::Italic, PenValue::Bool(true));
                }
                4 => {
                    let style = if csi_arg_has_more(args[i]) {
                        // CSI 4:3 m selects the underline style directly.
                        i += 1;
                        match csi_arg_or(args[i], 1) {
                            0 => Underline::Off,
                            2 => Underline::Double,
                            3 => Underline::Curly,
                            _ => Underline::Single,
                        }
                    } else {
                        Underline::Single
                    };
                    self.attrs.underline = style;
                    emit(PenAttr::Underline, PenValue::Int(Self::underline_value(style)));
                }
                5 => {
                    self.attrs.set_blinking(true);
                    emit(PenAttr::Blink, PenValue::Bool(true));
                }
                7 => {
                    self.attrs.set_reverse(true);
                    emit(PenAttr::Reverse, PenValue::Bool(true));
                }
                8 => {
                    self.attrs.set_concealed(true);
                    emit(PenAttr::Conceal, PenValue::Bool(true));
                }
                9 => {
                    self.attrs.set_crossed_out(true);
                    emit(PenAttr::Strike, PenValue::Bool(true));
                }
                10..=19 => {
                    self.attrs.font = (code - 10) as u8;
                    emit(PenAttr::Font, PenValue::Int((code - 10) as i32));
                }
                21 => {
                    self.attrs.underline = Underline::Double;
                    emit(PenAttr::Underline, PenValue::Int(2));
                }
                22 => {
                    self.attrs.set_bold(false);
                    emit(PenAttr::Bold, PenValue::Bool(false));
                }
                23 => {
                    self.attrs.set_italic(false);
                    emit(PenAttr::Italic, PenValue::Bool(false));
                }
                24 => {
                    self.attrs.underline = Underline::Off;
                    emit(PenAttr::Underline, PenValue::Int(0));
                }
                25 => {
                    self.attrs.set_blinking(false);
                    emit(PenAttr::Blink, PenValue::Bool(false));
                }
                27 => {
                    self.attrs.set_reverse(false);
                    emit(PenAttr::Reverse, PenValue::Bool(false));
                }
                28 => {
                    self.attrs.set_concealed(false);
                    emit(PenAttr::Conceal, PenValue::Bool(false));
                }
                29 => {
                    self.attrs.set_crossed_out(false);
                    emit(PenAttr::Strike, PenValue::Bool(false));
                }
                30..=37 => {
                    let mut idx = (code - 30) as u8;
                    if bold_highbright && self.attrs.is_bold() {
                        idx += 8;
                    }
                    self.fg = Color::index(idx);
                    emit(PenAttr::Foreground, PenValue::Color(self.fg));
                }
                38 => {
                    if let Some(color) = lookup_color(args, &mut i) {
                        self.fg = color;
                        emit(PenAttr::Foreground, PenValue::Color(self.fg));
                    }
                }
                39 => {
                    self.fg = palette.default_fg();
                    emit(PenAttr::Foreground, PenValue::Color(self.fg));
                }
                40..=47 => {
                    self.bg = Color::index((code - 40) as u8);
                    emit(PenAttr::Background, PenValue::Color(self.bg));
                }
                48 => {
                    if let Some(color) = lookup_color(args, &mut i) {
                        self.bg = color;
                        emit(PenAttr::Background, PenValue::Color(self.bg));
                    }
                }
                49 => {
                    self.bg = palette.default_bg();
                    emit(PenAttr::Background, PenValue::Color(self.bg));
                }
                73 => {
                    self.attrs.set_small(true);
                    self.attrs.baseline = Baseline::Raise;
                    emit(PenAttr::Small, PenValue::Bool(true));
                    emit(PenAttr::Baseline, PenValue::Int(1));
                }
                74 => {
                    self.attrs.set_small(true);
                    self.attrs.baseline = Baseline::Lower;
                    emit(PenAttr::Small, PenValue::Bool(true));
                    emit(PenAttr::Baseline, PenValue::Int(2));
                }
                75 => {
                    self.attrs.set_small(false);
                    self.attrs.baseline = Baseline::Normal;
                    emit(PenAttr::Small, PenValue::Bool(false));
                    emit(PenAttr::Baseline, PenValue::Int(0));
                }
                90..=97 => {
                    self.fg = Color::index((code - 90 + 8) as u8);
                    emit(PenAttr::Foreground, PenValue::Color(self.fg));
                }
                100..=107 => {
                    self.bg = Color::index((code - 100 + 8) as u8);
                    emit(PenAttr::Background, PenValue::Color(self.bg));
                }
                _ => {
                    log::debug!("unhandled SGR parameter {code}");
                    // Skip the rest of an unrecognized colon chain.
                    while csi_arg_has_more(args[i]) && i + 1 < args.len() {
                        i += 1;
                    }
                }
            }
            i += 1;
        }
    }

    /// Serialize the pen back into SGR parameters, for the DECRQSS reply.
    pub(crate) fn sgr_params(&self) -> String {
        let mut out = String::new();
        let mut push = |s: &str, out: &mut String| {
            if !out.is_empty() {
                out.push(';');
            }
            out.push_str(s);
        };

        if self.attrs.is_bold() {
            push("1", &mut out);
        }
        if self.attrs.is_italic() {
            push("3", &mut out);
        }
        match self.attrs.underline {
            Underline::Off => {}
            Underline::Single => push("4", &mut out),
            Underline::Curly => push("4:3", &mut out),
            Underline::Double => push("21", &mut out),
        }
        if self.attrs.is_blinking() {
            push("5", &mut out);
        }
        if self.attrs.is_reverse() {
            push("7", &mut out);
        }
        if self.attrs.is_concealed() {
            push("8", &mut out);
        }
        if self.attrs.is_crossed_out() {
            push("9", &mut out);
        }
        if self.attrs.font > 0 {
            push(&(10 + i32::from(self.attrs.font)).to_string(), &mut out);
        }
        match self.attrs.baseline {
            Baseline::Normal => {}
            Baseline::Raise => push("73", &mut out),
            Baseline::Lower => push("74", &mut out),
        }
        if !self.fg.is_default_fg() {
            push(&color_params(self.fg, 30), &mut out);
        }
        if !self.bg.is_default_bg() {
            push(&color_params(self.bg, 40), &mut out);
        }
        out
    }
}

fn color_params(color: Color, base: i32) -> String {
    match color.value {
        crate::ColorValue::Indexed(idx) if idx < 8 => (base + i32::from(idx)).to_string(),
        crate::ColorValue::Indexed(idx) if idx < 16 => {
            (base + 60 + i32::from(idx) - 8).to_string()
        }
        crate::ColorValue::Indexed(idx) => format!("{}:5:{idx}", base + 8),
        crate::ColorValue::Rgb(r, g, b) => format!("{}:2:{r}:{g}:{b}", base + 8),
    }
}

/// Parse an extended color introduced by SGR 38/48, in either the
/// semicolon form (`38;5;n`, `38;2;r;g;b`) or the colon sub-parameter form
/// (`38:5:n`, `38:2:r:g:b`, `38:2::r:g:b`). `i` points at the 38/48
/// argument and is left on the last argument consumed.
fn lookup_color(args: &[i64], i: &mut usize) -> Option<Color> {
    if csi_arg_has_more(args[*i]) {
        let mut subs = Vec::new();
        while csi_arg_has_more(args[*i]) && *i + 1 < args.len() {
            *i += 1;
            subs.push(csi_arg_or(args[*i], 0));
        }
        match subs.first() {
            Some(5) if subs.len() >= 2 => Some(Color::index(subs[1].clamp(0, 255) as u8)),
            Some(2) if subs.len() >= 4 => {
                // A 5-element chain carries a colorspace id in slot 1.
                let rgb = &subs[subs.len() - 3..];
                Some(Color::rgb(
                    rgb[0].clamp(0, 255) as u8,
                    rgb[1].clamp(0, 255) as u8,
                    rgb[2].clamp(0, 255) as u8,
                ))
            }
            _ => None,
        }
    } else {
        match args.get(*i + 1).map(|&a| csi_arg(a)) {
            Some(5) => {
                let idx = args.get(*i + 2).map_or(0, |&a| csi_arg_or(a, 0));
                *i += 2;
                Some(Color::index(idx.clamp(0, 255) as u8))
            }
            Some(2) => {
                let r = args.get(*i + 2).map_or(0, |&a| csi_arg_or(a, 0));
                let g = args.get(*i + 3).map_or(0, |&a| csi_arg_or(a, 0));
                let b = args.get(*i + 4).map_or(0, |&a| csi_arg_or(a, 0));
                *i += 4;
                Some(Color::rgb(
                    r.clamp(0, 255) as u8,
                    g.clamp(0, 255) as u8,
                    b.clamp(0, 255) as u8,
                ))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(pen: &mut Pen, args: &[i64]) {
        let palette = Palette::default();
        pen.apply_sgr(args, &palette, false, &mut |_, _| {});
    }

    #[test]
    fn roundtrip_simple() {
        let mut pen = Pen::default();
        pen.reset(&Palette::default());
        apply(&mut pen, &[1, 5, 7]);
        assert_eq!(pen.sgr_params(), "1;5;7");
    }

    #[test]
    fn roundtrip_ansi_colors() {
        let mut pen = Pen::default();
        pen.reset(&Palette::default());
        apply(&mut pen, &[31, 42]);
        assert_eq!(pen.sgr_params(), "31;42");
    }

    #[test]
    fn roundtrip_hibright_colors() {
        let mut pen = Pen::default();
        pen.reset(&Palette::default());
        apply(&mut pen, &[93, 104]);
        assert_eq!(pen.sgr_params(), "93;104");
    }

    #[test]
    fn semicolon_and_colon_forms_agree() {
        let palette = Palette::default();
        let mut a = Pen::default();
        a.reset(&palette);
        a.apply_sgr(&[38, 5, 56], &palette, false, &mut |_, _| {});

        use charcell_parser_core::CSI_ARG_FLAG_MORE;
        let mut b = Pen::default();
        b.reset(&palette);
        b.apply_sgr(
            &[38 | CSI_ARG_FLAG_MORE, 5 | CSI_ARG_FLAG_MORE, 56],
            &palette,
            false,
            &mut |_, _| {},
        );

        assert_eq!(a.fg, b.fg);
        assert_eq!(a.sgr_params(), "38:5:56");
    }

    #[test]
    fn bold_highbright_raises_palette_fg() {
        let palette = Palette::default();
        let mut pen = Pen::default();
        pen.reset(&palette);
        pen.apply_sgr(&[31, 1], &palette, true, &mut |_, _| {});
        assert_eq!(pen.fg, Color::index(9));
    }
}
