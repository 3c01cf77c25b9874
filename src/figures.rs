use crate::model::Grid;
use crate::simulation::Path;
use crate::solver::Solution;
use anyhow::{Context, Result};
use rmp_serde::encode;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path as FsPath,
};

/// Plot-ready line chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Figure {
    fn new(title: &str, x_label: &str, y_label: &str, x: &[f64], y: &[f64]) -> Self {
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }
}

/// Build the policy, value and simulation charts, keyed by file stem.
///
/// Policy charts are drawn against the grid, simulation charts against
/// the periods `1..=T`.
pub fn build(grid: &Grid, sol: &Solution, path: &Path) -> Vec<(String, Figure)> {
    let growth = sol.production.is_some();
    let (sym, name) = if growth { ("k", "Capital Stock") } else { ("W", "Cake Size") };
    let stem = sym.to_lowercase();

    let x_state = format!("${sym}_{{t}}$");
    let x_time = "Time";
    let time: Vec<f64> = (1..=path.consumption.len()).map(|t| t as f64).collect();

    let mut figs = vec![
        (
            format!("{stem}pol"),
            Figure::new(
                &format!("{} Policy Function", if growth { "Capital" } else { name }),
                &x_state,
                &format!("${sym}_{{t+1}}$"),
                grid.vals(),
                &sol.next_state,
            ),
        ),
        (
            "cpol".to_string(),
            Figure::new(
                "Consumption Policy Function",
                &x_state,
                "$C_{t}$",
                grid.vals(),
                &sol.consumption,
            ),
        ),
        (
            "vfun".to_string(),
            Figure::new(
                "Value Function",
                &x_state,
                &format!("$V_t({sym}_t)$"),
                grid.vals(),
                &sol.value,
            ),
        ),
    ];

    if let Some(prod) = &sol.production {
        figs.push((
            "ipol".to_string(),
            Figure::new(
                "Investment Policy Function",
                &x_state,
                "$I_{t}$",
                grid.vals(),
                &prod.investment,
            ),
        ));
        figs.push((
            "ypol".to_string(),
            Figure::new("Output", &x_state, "$Y_{t}$", grid.vals(), &prod.output),
        ));
    }

    figs.push((
        format!("{stem}sim"),
        Figure::new(
            &format!("Simulated {name}"),
            x_time,
            &format!("${sym}^{{sim}}_t$"),
            &time,
            &path.next_state,
        ),
    ));
    figs.push((
        "csim".to_string(),
        Figure::new(
            "Simulated Consumption",
            x_time,
            "$C^{sim}_t$",
            &time,
            &path.consumption,
        ),
    ));

    if let Some(prod) = &path.production {
        figs.push((
            "isim".to_string(),
            Figure::new(
                "Simulated Investment",
                x_time,
                "$I^{sim}_t$",
                &time,
                &prod.investment,
            ),
        ));
        figs.push((
            "ysim".to_string(),
            Figure::new("Simulated Output", x_time, "$Y^{sim}_t$", &time, &prod.output),
        ));
    }

    figs.push((
        "usim".to_string(),
        Figure::new("Simulated Utility", x_time, "$U^{sim}_t$", &time, &path.utility),
    ));

    figs
}

/// Write every figure to `<dir>/<stem>.msgpack`, creating `dir` if needed.
pub fn write_all<P: AsRef<FsPath>>(dir: P, figs: &[(String, Figure)]) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("failed to create {dir:?}"))?;

    for (stem, fig) in figs {
        let file = dir.join(format!("{stem}.msgpack"));
        let writer = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(writer);
        encode::write_named(&mut writer, fig)
            .with_context(|| format!("failed to serialize {stem}"))?;
        writer.flush().context("failed to flush writer stream")?;
        log::info!("wrote {file:?}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Production;

    fn solution(n: usize, production: bool) -> Solution {
        let vals = vec![1.0; n];
        Solution {
            value: vals.clone(),
            policy: vec![0; n],
            next_state: vals.clone(),
            consumption: vals.clone(),
            production: production.then(|| Production {
                output: vals.clone(),
                investment: vals.clone(),
            }),
        }
    }

    fn path(periods: usize, production: bool) -> Path {
        let vals = vec![2.0; periods];
        Path {
            state_idx: vec![0; periods],
            next_state: vals.clone(),
            consumption: vals.clone(),
            utility: vals.clone(),
            production: production.then(|| Production {
                output: vals.clone(),
                investment: vals.clone(),
            }),
        }
    }

    fn stems(figs: &[(String, Figure)]) -> Vec<&str> {
        figs.iter().map(|(stem, _)| stem.as_str()).collect()
    }

    #[test]
    fn cake_figures() {
        let grid = Grid::linspace(0.0, 1.0, 8);
        let figs = build(&grid, &solution(8, false), &path(5, false));
        assert_eq!(
            stems(&figs),
            ["wpol", "cpol", "vfun", "wsim", "csim", "usim"]
        );
        let (_, wpol) = &figs[0];
        assert_eq!(wpol.title, "Cake Size Policy Function");
        assert_eq!(wpol.x_label, "$W_{t}$");
        assert_eq!(wpol.y_label, "$W_{t+1}$");
        assert_eq!(wpol.x, grid.vals());
        let (_, csim) = &figs[4];
        assert_eq!(csim.x, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(csim.y.len(), 5);
    }

    #[test]
    fn growth_figures() {
        let grid = Grid::linspace(1.0, 2.0, 8);
        let figs = build(&grid, &solution(8, true), &path(5, true));
        assert_eq!(
            stems(&figs),
            ["kpol", "cpol", "vfun", "ipol", "ypol", "ksim", "csim", "isim", "ysim", "usim"]
        );
        let (_, ksim) = &figs[5];
        assert_eq!(ksim.title, "Simulated Capital Stock");
        assert_eq!(ksim.y_label, "$k^{sim}_t$");
        for (_, fig) in &figs {
            assert_eq!(fig.x.len(), fig.y.len());
        }
    }
}
