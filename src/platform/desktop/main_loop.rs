use std::time::Duration;

use clap::{App, AppSettings, Arg, SubCommand};

use crate::{simulation_parameters::SimulationParams, FluidSimulation, SceneConfig};

use super::svg_exporter::SvgExporter;

const CARGO_PKG_AUTHORS: &'static str = env!("CARGO_PKG_AUTHORS");
const CARGO_PKG_VERSION: &'static str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &'static str = env!("CARGO_PKG_DESCRIPTION");

pub fn start() {
    let matches = App::new("PBD Fluid Simulation")
        .version(CARGO_PKG_VERSION)
        .author(CARGO_PKG_AUTHORS)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("run")
                .about("Run simulation with given config")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .help("Sets the simulation parameters")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("SCENE_CONFIG")
                        .help("Scene setup")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::with_name("STEPS")
                        .long("steps")
                        .short("n")
                        .required(false)
                        .takes_value(true)
                        .help("Number of simulation steps to run"),
                )
                .arg(
                    Arg::with_name("EXPORT_SVG")
                        .long("export-svg")
                        .short("o")
                        .required(false)
                        .takes_value(true)
                        .help("Directory where SVG snapshots are written to"),
                )
                .arg(
                    Arg::with_name("EXPORT_EVERY")
                        .long("export-every")
                        .short("k")
                        .required(false)
                        .takes_value(true)
                        .help("Write a snapshot every K steps"),
                ),
        )
        .subcommand(
            SubCommand::with_name("print-config")
                .about("Write the default simulation and scene config YAML documents to stdout"),
        )
        .get_matches();

    if let Some(run_matches) = matches.subcommand_matches("run") {
        let parameter_file = run_matches
            .value_of("SIMULATION_CONFIG")
            .expect("missing simulation config");
        let params_yaml = std::fs::read_to_string(parameter_file).expect("failed reading parameter file");
        let simulation_params: SimulationParams =
            serde_yaml::from_str(&params_yaml).expect("failed parsing simulation config file");
        println!("{:?}", simulation_params);

        let scene_file_path = run_matches.value_of("SCENE_CONFIG").expect("missing scene config");
        let scene_yaml = std::fs::read_to_string(scene_file_path).expect("failed reading scene file");
        let scene_config: SceneConfig = serde_yaml::from_str(&scene_yaml).expect("failed parsing scene config file");
        println!("{:?}", scene_config);

        let steps = run_matches
            .value_of("STEPS")
            .map(|x| x.parse::<usize>().expect("STEPS is not a number"))
            .unwrap_or(1000);
        let export_every = run_matches
            .value_of("EXPORT_EVERY")
            .map(|x| x.parse::<usize>().expect("EXPORT_EVERY is not a number"))
            .unwrap_or(10);

        let mut svg_exporter = run_matches.value_of("EXPORT_SVG").map(|folder| {
            SvgExporter::new(folder, "pbd-fluid").expect("failed creating SVG export directory")
        });

        let mut fluid_simulation =
            FluidSimulation::new(simulation_params, &scene_config).expect("invalid configuration");

        let mut total_duration: Duration = Duration::from_nanos(0);

        for _ in 0..steps {
            let a = std::time::Instant::now();
            fluid_simulation.single_step();
            let b = std::time::Instant::now();

            total_duration += b - a;

            println!(
                "{:05}: {} particles {}msec ({}msec AVG)",
                fluid_simulation.step_number(),
                fluid_simulation.num_particles(),
                (b - a).as_secs_f32() * 1000.,
                (total_duration / fluid_simulation.step_number() as u32).as_secs_f32() * 1000.
            );

            if let Some(svg_exporter) = &mut svg_exporter {
                if fluid_simulation.step_number() % export_every == 0 {
                    svg_exporter
                        .add_snapshot(&fluid_simulation)
                        .expect("failed writing SVG snapshot");
                }
            }
        }
    } else if matches.subcommand_matches("print-config").is_some() {
        let params_yaml =
            serde_yaml::to_string(&SimulationParams::default()).expect("failed serializing default parameters");
        let scene_yaml = serde_yaml::to_string(&SceneConfig::default()).expect("failed serializing default scene");
        println!("{}", params_yaml);
        println!("{}", scene_yaml);
    } else {
        unreachable!()
    }
}
