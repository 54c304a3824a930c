//! Stage sequencing: interpolate along each axis in turn, then collapse the
//! nuisance dimension.
//!
//! For running emissions the year axis is filled first, within groups keyed
//! by (region, month, road class, speed); the speed axis is filled second,
//! within groups keyed by (region, year, month, road class). The second stage
//! groups on years that only exist once the first stage has run, so the order
//! is fixed and checked when the pipeline is built.
use log::info;

use crate::columns;
use crate::errors::{ErltError, ErltResult};
use crate::interpolate::{interpolate_grouped, InterpolationSpec};
use crate::reduce::{reduce, AggFunc, Reduction};
use crate::table::Table;

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    stages: Vec<InterpolationSpec>,
    reduction: Option<Reduction>,
}

/// Every intermediate of a pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutput {
    /// Output of each interpolation stage, in stage order
    pub stages: Vec<Table>,
    /// Output of the reduction, if the pipeline has one
    pub reduced: Option<Table>,
}

/// A stage's table as seen by [`Pipeline::run_with`].
#[derive(Clone, Copy, Debug)]
pub enum StageView<'a> {
    /// Sparse table about to be interpolated
    Input(&'a Table),
    /// Filled table the stage produced
    Output(&'a Table),
}

impl PipelineOutput {
    /// The artifact to publish: the reduced table, or the last stage's output.
    pub fn final_table(&self) -> Option<&Table> {
        self.reduced.as_ref().or(self.stages.last())
    }
}

impl Pipeline {
    /// # Errors
    /// * `EmptyPipeline` if there are no stages
    /// * `StageOrder` if a stage does not group by the axis of an earlier stage
    pub fn new(stages: Vec<InterpolationSpec>, reduction: Option<Reduction>) -> ErltResult<Self> {
        if stages.is_empty() {
            return Err(ErltError::EmptyPipeline);
        }
        for (i, stage) in stages.iter().enumerate() {
            for earlier in &stages[..i] {
                if !stage.group_by.contains(&earlier.axis.column) {
                    return Err(ErltError::StageOrder {
                        stage: i,
                        axis: stage.axis.column.clone(),
                        missing: earlier.axis.column.clone(),
                    });
                }
            }
        }
        Ok(Self { stages, reduction })
    }

    /// Running emissions: years, then speeds, then the worst month per year.
    pub fn running(quantities: &[String]) -> ErltResult<Self> {
        use columns::{AREA, AVG_SPEED, MONTH, ROAD_CLASS, YEAR};
        Self::new(
            vec![
                InterpolationSpec::standard(
                    YEAR,
                    &[AREA, MONTH, ROAD_CLASS, AVG_SPEED],
                    quantities,
                )?,
                InterpolationSpec::standard(
                    AVG_SPEED,
                    &[AREA, YEAR, MONTH, ROAD_CLASS],
                    quantities,
                )?,
            ],
            Some(Reduction::new(
                [AREA, YEAR, ROAD_CLASS, AVG_SPEED].map(String::from).to_vec(),
                quantities.to_vec(),
                AggFunc::Max,
            )),
        )
    }

    /// Start emissions: years only, then the worst month per year.
    pub fn starts(quantities: &[String]) -> ErltResult<Self> {
        use columns::{AREA, FUEL_TYPE, MONTH, VEHICLE_TYPE, YEAR};
        Self::new(
            vec![InterpolationSpec::standard(
                YEAR,
                &[AREA, MONTH, VEHICLE_TYPE, FUEL_TYPE],
                quantities,
            )?],
            Some(Reduction::new(
                [AREA, YEAR, VEHICLE_TYPE, FUEL_TYPE].map(String::from).to_vec(),
                quantities.to_vec(),
                AggFunc::Max,
            )),
        )
    }

    /// Idling emissions: years only, then the worst month per year.
    pub fn idling(quantities: &[String]) -> ErltResult<Self> {
        Self::year_then_worst_month(&[columns::AREA], quantities)
    }

    /// Extended idle emissions, per process type.
    pub fn extended_idle(quantities: &[String]) -> ErltResult<Self> {
        Self::year_then_worst_month(&[columns::AREA, columns::PROCESS_TYPE], quantities)
    }

    fn year_then_worst_month(keys: &[&str], quantities: &[String]) -> ErltResult<Self> {
        use columns::{MONTH, YEAR};
        let mut group_by = keys.to_vec();
        group_by.insert(1, MONTH);
        let mut reduce_by: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        reduce_by.insert(1, YEAR.to_string());
        Self::new(
            vec![InterpolationSpec::standard(YEAR, &group_by, quantities)?],
            Some(Reduction::new(reduce_by, quantities.to_vec(), AggFunc::Max)),
        )
    }

    pub fn stages(&self) -> &[InterpolationSpec] {
        &self.stages
    }

    pub fn reduction(&self) -> Option<&Reduction> {
        self.reduction.as_ref()
    }

    /// Run every stage in order, feeding each stage the previous output.
    ///
    /// The first failing stage aborts the run; no partial output is returned.
    pub fn run(&self, input: &Table) -> ErltResult<PipelineOutput> {
        self.run_with(input, |_, _, _| Ok(()))
    }

    /// As [`Pipeline::run`], handing each stage's input and output to
    /// `inspect` as soon as it exists. An error from `inspect` aborts the run.
    pub fn run_with<F>(&self, input: &Table, mut inspect: F) -> ErltResult<PipelineOutput>
    where
        F: FnMut(usize, &InterpolationSpec, StageView<'_>) -> ErltResult<()>,
    {
        let mut outputs: Vec<Table> = Vec::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate() {
            let source = outputs.last().unwrap_or(input);
            inspect(i, stage, StageView::Input(source))?;
            let filled = interpolate_grouped(source, stage)?;
            info!(
                "stage {} filled {}: {} row(s) -> {} row(s)",
                i + 1,
                stage.axis.column,
                source.len(),
                filled.len()
            );
            inspect(i, stage, StageView::Output(&filled))?;
            outputs.push(filled);
        }

        let reduced = match &self.reduction {
            Some(reduction) => {
                let last = outputs.last().ok_or(ErltError::EmptyPipeline)?;
                let table = reduce(last, reduction)?;
                info!(
                    "collapsed to [{}] with {}: {} row(s)",
                    reduction.group_by.join(", "),
                    reduction.agg,
                    table.len()
                );
                Some(table)
            }
            None => None,
        };

        Ok(PipelineOutput {
            stages: outputs,
            reduced,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::axis::AxisPolicy;
    use crate::grid::Grid;
    use crate::table::Label;

    fn quantities() -> Vec<String> {
        vec!["CO".into(), "NOX".into()]
    }

    /// Two months, one area and road class; years 2020/2022, speeds 5/10
    fn sparse() -> Table {
        let dims = ["Area", "monthid", "funclass", "avgspeed", "yearid"];
        let mut t = Table::new(dims, quantities()).unwrap();
        for (month, scale) in [(1, 1.0), (7, 2.0)] {
            for (speed, base) in [(5.0, 8.0), (10.0, 4.0)] {
                for (year, trend) in [(2020, 0.0), (2022, 2.0)] {
                    t.push(
                        vec!["X".into(), month.into(), "A".into(), speed.into(), year.into()],
                        vec![scale * (base + trend), 0.1 * scale],
                    )
                    .unwrap();
                }
            }
        }
        t
    }

    fn small_running() -> Pipeline {
        Pipeline::new(
            vec![
                InterpolationSpec::new(
                    AxisPolicy::year(),
                    Grid::years(2020, 2022).unwrap(),
                    vec!["Area".into(), "monthid".into(), "funclass".into(), "avgspeed".into()],
                    quantities(),
                )
                .unwrap(),
                InterpolationSpec::new(
                    AxisPolicy::avg_speed(),
                    Grid::new("avgspeed", vec![5.0, 6.0, 8.0, 10.0]).unwrap(),
                    vec!["Area".into(), "yearid".into(), "monthid".into(), "funclass".into()],
                    quantities(),
                )
                .unwrap(),
            ],
            Some(Reduction::new(
                vec!["Area".into(), "yearid".into(), "funclass".into(), "avgspeed".into()],
                quantities(),
                AggFunc::Max,
            )),
        )
        .unwrap()
    }

    #[test]
    fn test_two_stage_run() {
        let out = small_running().run(&sparse()).unwrap();
        assert_eq!(out.stages.len(), 2);
        // 2 months x 2 speeds x 3 years
        assert_eq!(out.stages[0].len(), 12);
        // 2 months x 3 years x 4 speeds
        assert_eq!(out.stages[1].len(), 24);

        let annual = out.final_table().unwrap();
        assert_eq!(annual.len(), 12);
        assert_eq!(
            annual.dims(),
            &["Area", "yearid", "funclass", "avgspeed"].map(String::from)
        );

        // Month 7 doubles month 1, so it is the annual maximum.
        // 2021 at speed 5: 2 * (8 + 1) = 18
        let key: Vec<Label> = vec!["X".into(), 2021.into(), "A".into(), 5.into()];
        assert_eq!(annual.lookup(&key, "CO").unwrap(), Some(18.0));

        // 2020 at speed 8, reciprocal between 5 (16) and 10 (8)
        let key: Vec<Label> = vec!["X".into(), 2020.into(), "A".into(), 8.into()];
        let t = (1.0 / 8.0 - 1.0 / 5.0) / (1.0 / 10.0 - 1.0 / 5.0);
        let want = 16.0 + t * (8.0 - 16.0);
        let got = annual.lookup(&key, "CO").unwrap().unwrap();
        assert!((got - want).abs() < 1e-12);

        annual
            .check_coverage(&[
                ("Area", vec!["X".into()]),
                ("yearid", Grid::years(2020, 2022).unwrap().labels()),
                ("funclass", vec!["A".into()]),
                ("avgspeed", small_running().stages()[1].grid.labels()),
            ])
            .unwrap();
    }

    #[test]
    fn test_stage_failure_aborts() {
        // Speed 10 only observed in 2020: stage one cannot fill it
        let mut t = sparse();
        let keep: Vec<_> = t
            .rows()
            .iter()
            .filter(|r| !(r.keys[3] == Label::from(10) && r.keys[4] == Label::from(2022)))
            .cloned()
            .collect();
        t = Table::new(t.dims().to_vec(), t.quantities().to_vec()).unwrap();
        for r in keep {
            t.push_row(r).unwrap();
        }
        assert!(matches!(
            small_running().run(&t),
            Err(ErltError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_run_with_sees_every_stage() {
        let mut seen = Vec::new();
        let out = small_running()
            .run_with(&sparse(), |i, stage, view| {
                let (kind, len) = match view {
                    StageView::Input(t) => ("in", t.len()),
                    StageView::Output(t) => ("out", t.len()),
                };
                seen.push((i, stage.axis.column.clone(), kind, len));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            seen,
            vec![
                (0, "yearid".to_string(), "in", 8),
                (0, "yearid".to_string(), "out", 12),
                (1, "avgspeed".to_string(), "in", 12),
                (1, "avgspeed".to_string(), "out", 24),
            ]
        );
        assert_eq!(out, small_running().run(&sparse()).unwrap());

        // A failing inspector stops the run before the stage executes
        let res = small_running().run_with(&sparse(), |i, _, _| {
            if i == 1 {
                Err(ErltError::EmptyPipeline)
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(ErltError::EmptyPipeline)));
    }

    #[test]
    fn test_stage_order() {
        let speed_first = Pipeline::new(
            vec![
                InterpolationSpec::standard("avgspeed", &["Area", "monthid"], &quantities())
                    .unwrap(),
                InterpolationSpec::standard("yearid", &["Area", "monthid"], &quantities())
                    .unwrap(),
            ],
            None,
        );
        match speed_first {
            Err(ErltError::StageOrder { stage, missing, .. }) => {
                assert_eq!(stage, 1);
                assert_eq!(missing, "avgspeed");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(Pipeline::new(vec![], None), Err(ErltError::EmptyPipeline)));
    }

    #[test]
    fn test_presets() {
        let q = crate::columns::pollutants();
        let running = Pipeline::running(&q).unwrap();
        assert_eq!(running.stages().len(), 2);
        assert_eq!(running.stages()[1].grid.len(), 74);
        assert_eq!(running.reduction().unwrap().agg, AggFunc::Max);

        let starts = Pipeline::starts(&q).unwrap();
        assert_eq!(starts.stages().len(), 1);
        assert_eq!(starts.stages()[0].grid.len(), 31);
        assert_eq!(
            starts.reduction().unwrap().group_by,
            ["Area", "yearid", "VehicleType", "FUELTYPE"].map(String::from)
        );

        let idling = Pipeline::idling(&q).unwrap();
        assert_eq!(
            idling.stages()[0].group_by,
            ["Area", "monthid"].map(String::from)
        );
        assert_eq!(
            idling.reduction().unwrap().group_by,
            ["Area", "yearid"].map(String::from)
        );

        let extnidle = Pipeline::extended_idle(&q).unwrap();
        assert_eq!(extnidle.stages().len(), 1);
        assert_eq!(
            extnidle.stages()[0].group_by,
            ["Area", "monthid", "Processtype"].map(String::from)
        );
        assert_eq!(
            extnidle.reduction().unwrap().group_by,
            ["Area", "yearid", "Processtype"].map(String::from)
        );
    }

    #[test]
    fn test_extended_idle_run() {
        let q = vec!["CO".to_string()];
        let mut t = Table::new(["Area", "monthid", "Processtype", "yearid"], q.clone()).unwrap();
        for process in ["Extended Idle", "APU"] {
            for (month, scale) in [(1, 2.0), (7, 1.0)] {
                for (year, co) in [(2020, 6.0), (2036, 4.0), (2050, 1.0)] {
                    t.push(
                        vec!["Waco".into(), month.into(), process.into(), year.into()],
                        vec![scale * co],
                    )
                    .unwrap();
                }
            }
        }
        let out = Pipeline::extended_idle(&q).unwrap().run(&t).unwrap();
        let erlt = out.final_table().unwrap();
        // 2 process types x 31 years
        assert_eq!(erlt.len(), 62);
        assert_eq!(erlt.dims(), &["Area", "yearid", "Processtype"].map(String::from));
        // January is the worst month: 2 * (6 - 2 * 8 / 16)
        let key: [Label; 3] = ["Waco".into(), 2028.into(), "APU".into()];
        assert_eq!(erlt.lookup(&key, "CO").unwrap(), Some(10.0));
    }
}
