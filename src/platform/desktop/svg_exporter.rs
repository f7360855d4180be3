use std::{fs::create_dir_all, io, path::PathBuf};

use svg::{
    node::element::{Circle, Polyline},
    Document,
};

use crate::FluidSimulation;

pub(crate) struct SvgExporter {
    /// something like './data/pbd-fluid' which will get expanded to './data/pbd-fluid-00001.svg'
    folder: PathBuf,
    basename: String,
    snapshot_number: usize,
}

impl SvgExporter {
    pub(crate) fn new(folder: impl Into<PathBuf>, basename: impl Into<String>) -> io::Result<SvgExporter> {
        let folder: PathBuf = folder.into();
        create_dir_all(&folder)?;

        Ok(SvgExporter {
            folder,
            basename: basename.into(),
            snapshot_number: 1,
        })
    }

    pub(crate) fn add_snapshot(&mut self, fluid_simulation: &FluidSimulation) -> io::Result<()> {
        let bounds = fluid_simulation.bounds;

        let mut document = Document::new().set("viewBox", format!("0 0 {} {}", bounds.width, bounds.height));

        // floor profile: flat run up to the slope start, then the seabed ramp
        document = document.add(
            Polyline::new()
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", 2)
                .set(
                    "points",
                    format!(
                        "0,{} {},{} {},{}",
                        bounds.height,
                        bounds.seabed_start_x,
                        bounds.height,
                        bounds.width,
                        bounds.floor_y(bounds.width)
                    ),
                ),
        );

        let r = fluid_simulation.params.target_separation * 0.25;
        for position in fluid_simulation.positions() {
            document = document.add(
                Circle::new()
                    .set("fill", "steelblue")
                    .set("cx", position.x)
                    .set("cy", position.y)
                    .set("r", r),
            );
        }

        let svg_filename = format!("{}-{:05}.svg", self.basename, self.snapshot_number);
        svg::save(self.folder.join(svg_filename), &document)?;

        self.snapshot_number += 1;
        Ok(())
    }
}
