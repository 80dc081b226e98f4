//! Charts module - Figure descriptions and PNG rendering

mod figure;
pub mod layout;
mod palette;
mod renderer;

pub use figure::{
    BarStat, DatedSeries, Facet, Figure, FigureKind, HueBarPanel, LinePanel, NamedValues,
    PanelLayout, PositionedSeries, XySeries,
};
pub use palette::Palette;
pub use renderer::{ChartRenderer, RenderError, RenderedChart};
