//! Built-in node implementations.

pub mod channel_sink;
pub mod gain;
pub mod moving_average;
pub mod synthetic_source;

pub use channel_sink::ChannelSink;
pub use gain::Gain;
pub use moving_average::MovingAverage;
pub use synthetic_source::SyntheticSource;
