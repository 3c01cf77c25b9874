use crate::config::{Config, ModelConfig};
use crate::figures;
use crate::model::{Economy, Grid};
use crate::simulation::{Path as SimPath, simulate};
use crate::solver::{Diagnostics, Solution, solve};
use anyhow::{Context, Result, bail};
use glob::glob;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Output of the solve stage.
#[derive(Serialize, Deserialize)]
pub struct SolutionRecord {
    pub cfg: Config,
    pub grid: Grid,
    pub solution: Solution,
    pub diagnostics: Diagnostics,
}

/// Output of the simulate stage.
#[derive(Serialize, Deserialize)]
pub struct SimulationRecord {
    pub cfg: Config,
    pub path: SimPath,
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn solve_model(&self) -> Result<()> {
        let economy = Economy::new(&self.cfg);
        let model = economy.as_model();

        let (solution, diagnostics) = solve(model, &self.cfg.solver);
        log::info!("{diagnostics:#?}");

        if let ModelConfig::Growth(growth) = &self.cfg.model {
            let grid = model.grid();
            let kss = growth.steady_state_capital();
            let i_ss = grid.nearest(kss);
            log::info!(
                "steady state capital {kss:.4}, policy near it maps {:.4} to {:.4}",
                grid[i_ss],
                solution.next_state[i_ss]
            );
        }

        let record = SolutionRecord {
            cfg: self.cfg.clone(),
            grid: model.grid().clone(),
            solution,
            diagnostics,
        };
        write_record(self.solution_file(), &record).context("failed to save solution")?;

        Ok(())
    }

    pub fn simulate_model(&self) -> Result<()> {
        let record = self.load_solution()?;

        let economy = Economy::new(&self.cfg);
        let path = simulate(economy.as_model(), &record.solution, &self.cfg.simulation)
            .context("failed to simulate model")?;

        let record = SimulationRecord {
            cfg: self.cfg.clone(),
            path,
        };
        write_record(self.simulation_file(), &record).context("failed to save simulation")?;

        Ok(())
    }

    pub fn plot_results(&self) -> Result<()> {
        let sol_record = self.load_solution()?;

        let sim_file = self.simulation_file();
        let sim_record: SimulationRecord =
            read_record(&sim_file).with_context(|| format!("failed to load {sim_file:?}"))?;
        if sim_record.cfg != self.cfg {
            bail!("simulation config differs from the current config");
        }

        let figs = figures::build(&sol_record.grid, &sol_record.solution, &sim_record.path);
        figures::write_all(self.figures_dir(), &figs).context("failed to write figures")?;

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for file in glob(pattern).context("failed to glob output files")? {
            let file = file.context("failed to read glob entry")?;
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }

        let figures_dir = self.figures_dir();
        if figures_dir.is_dir() {
            fs::remove_dir_all(&figures_dir)
                .with_context(|| format!("failed to remove {figures_dir:?}"))?;
            log::info!("removed {figures_dir:?}");
        }

        Ok(())
    }

    fn load_solution(&self) -> Result<SolutionRecord> {
        let file = self.solution_file();
        let record: SolutionRecord =
            read_record(&file).with_context(|| format!("failed to load {file:?}"))?;
        if record.cfg != self.cfg {
            bail!("solution config differs from the current config");
        }
        log::info!("loaded {file:?}");
        Ok(record)
    }

    fn solution_file(&self) -> PathBuf {
        self.sim_dir.join("solution.msgpack")
    }

    fn simulation_file(&self) -> PathBuf {
        self.sim_dir.join("simulation.msgpack")
    }

    fn figures_dir(&self) -> PathBuf {
        self.sim_dir.join("figures")
    }
}

fn write_record<P: AsRef<Path>, T: Serialize>(file: P, record: &T) -> Result<()> {
    let file = file.as_ref();
    let writer = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(writer);
    encode::write_named(&mut writer, record).context("failed to serialize record")?;
    writer.flush().context("failed to flush writer stream")?;
    log::info!("wrote {file:?}");
    Ok(())
}

fn read_record<P: AsRef<Path>, T: DeserializeOwned>(file: P) -> Result<T> {
    let file = file.as_ref();
    let reader = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(reader);
    let record = decode::from_read(&mut reader).context("failed to deserialize record")?;
    Ok(record)
}
