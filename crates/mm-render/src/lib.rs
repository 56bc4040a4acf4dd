pub mod connector;
pub mod hit;
pub mod paint;

pub use connector::{Connector, ConnectorSet, connector_path};
pub use hit::{drop_target, hit_test, hit_test_rect};
pub use paint::{PaintTheme, paint_scene};
