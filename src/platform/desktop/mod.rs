mod main_loop;
mod svg_exporter;

pub use main_loop::start;
