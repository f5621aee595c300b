use serde::{Deserialize, Serialize};

use crate::*;

/// The board as the solver sees it: observable, and accepting mine marks.
pub trait Playfield {
    /// Builds a fresh grid from the current state of the board.
    fn observe(&mut self) -> Result<Grid>;

    /// Marks one cell as a mine, fire-and-forget.
    fn mark_mine(&mut self, coords: Coord2) -> Result<()>;

    /// Called once after each batch of marks, before the next observation.
    fn settle(&mut self) {}
}

impl<P: Playfield + ?Sized> Playfield for &mut P {
    fn observe(&mut self) -> Result<Grid> {
        (**self).observe()
    }

    fn mark_mine(&mut self, coords: Coord2) -> Result<()> {
        (**self).mark_mine(coords)
    }

    fn settle(&mut self) {
        (**self).settle()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// The clue that fired and the mines it marked, in emission order.
    Marked(Deduction),
    FixedPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Every mark sent to the playfield, in order.
    pub marks: Vec<Coord2>,
    pub rounds: usize,
    pub observations: usize,
    pub grid: Grid,
}

/// Runs the satisfied-count rule against a playfield until nothing new is found.
///
/// Each round acts on exactly one clue, then throws the grid away and observes
/// the board again.
#[derive(Debug)]
pub struct Solver<P> {
    playfield: P,
    grid: Grid,
    marks: Vec<Coord2>,
    rounds: usize,
    observations: usize,
}

impl<P: Playfield> Solver<P> {
    pub fn new(mut playfield: P) -> Result<Self> {
        let grid = playfield.observe()?;
        log::info!("initial observation: {:?} grid", grid.size());
        Ok(Self {
            playfield,
            grid,
            marks: Vec::new(),
            rounds: 0,
            observations: 1,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn marks(&self) -> &[Coord2] {
        &self.marks
    }

    pub fn step(&mut self) -> Result<StepOutcome> {
        let Some(deduction) = find_deduction(&self.grid) else {
            return Ok(StepOutcome::FixedPoint);
        };

        let marked = apply_deduction(&mut self.grid, &deduction)?;
        if marked.is_empty() {
            // forced cells are unknown by construction
            log::warn!("clue {:?} fired without new marks", deduction.clue);
            return Ok(StepOutcome::FixedPoint);
        }

        for &coords in &marked {
            log::debug!("marking mine at {:?}", coords);
            self.playfield.mark_mine(coords)?;
        }
        self.marks.extend_from_slice(&marked);
        self.rounds += 1;

        self.playfield.settle();
        self.reobserve()?;

        Ok(StepOutcome::Marked(Deduction {
            clue: deduction.clue,
            mines: marked,
        }))
    }

    pub fn run(mut self) -> Result<RunReport> {
        while let StepOutcome::Marked(_) = self.step()? {}

        log::info!(
            "fixed point after {} round(s), {} mine(s) marked",
            self.rounds,
            self.marks.len()
        );
        Ok(self.into_report())
    }

    pub fn into_report(self) -> RunReport {
        RunReport {
            marks: self.marks,
            rounds: self.rounds,
            observations: self.observations,
            grid: self.grid,
        }
    }

    fn reobserve(&mut self) -> Result<()> {
        let mut fresh = self.playfield.observe()?;
        self.observations += 1;
        fresh.carry_mines(&self.grid)?;
        self.grid = fresh;
        Ok(())
    }
}

pub fn run_to_fixed_point<P: Playfield>(playfield: P) -> Result<RunReport> {
    Solver::new(playfield)?.run()
}

/// Playfield backed by a grid in memory, marks land on it directly.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryPlayfield {
    grid: Grid,
    marked: Vec<Coord2>,
}

impl MemoryPlayfield {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            marked: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn marked(&self) -> &[Coord2] {
        &self.marked
    }
}

impl Playfield for MemoryPlayfield {
    fn observe(&mut self) -> Result<Grid> {
        Ok(self.grid.clone())
    }

    fn mark_mine(&mut self, coords: Coord2) -> Result<()> {
        self.grid.mark_mine(coords)?;
        self.marked.push(coords);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rand::prelude::*;

    use super::*;
    use crate::sim::{GameConfig, RandomLayoutGenerator, StartTile};

    fn grid(text: &str) -> Grid {
        text.parse().unwrap()
    }

    /// Replays a fixed sequence of observations and records marks.
    struct Scripted {
        frames: VecDeque<Grid>,
        marks: Vec<Coord2>,
        settles: usize,
    }

    impl Scripted {
        fn new(frames: Vec<Grid>) -> Self {
            Self {
                frames: frames.into(),
                marks: Vec::new(),
                settles: 0,
            }
        }
    }

    impl Playfield for Scripted {
        fn observe(&mut self) -> Result<Grid> {
            self.frames.pop_front().ok_or(SweepError::Desktop("no frames left".into()))
        }

        fn mark_mine(&mut self, coords: Coord2) -> Result<()> {
            self.marks.push(coords);
            Ok(())
        }

        fn settle(&mut self) {
            self.settles += 1;
        }
    }

    #[test]
    fn each_step_marks_one_clue() {
        let mut solver = Solver::new(MemoryPlayfield::new(grid("1 #\n. ."))).unwrap();
        assert!(solver.marks().is_empty());

        let outcome = solver.step().unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Marked(Deduction {
                clue: (0, 0),
                mines: vec![(0, 1)],
            })
        );
        assert_eq!(solver.marks(), &[(0, 1)]);
        assert_eq!(solver.grid()[(0, 1)], Cell::Mine);
        assert_eq!(solver.step().unwrap(), StepOutcome::FixedPoint);
    }

    #[test]
    fn no_clues_terminates_without_actions() {
        let mut playfield = MemoryPlayfield::new(grid("# #\n# #"));

        let report = run_to_fixed_point(&mut playfield).unwrap();

        assert!(report.marks.is_empty());
        assert_eq!(report.rounds, 0);
        assert_eq!(report.observations, 1);
        assert!(playfield.marked().is_empty());
    }

    #[test]
    fn eight_clue_marks_all_neighbors_in_one_round() {
        let mut playfield = MemoryPlayfield::new(grid("# # #\n# 8 #\n# # #"));

        let report = run_to_fixed_point(&mut playfield).unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.marks.len(), 8);
        assert_eq!(report.observations, 2);
        assert_eq!(playfield.grid().count(Cell::Mine), 8);
    }

    #[test]
    fn one_clue_at_a_time_then_reobserve() {
        let mut playfield = MemoryPlayfield::new(grid("1 # 1\n. . #"));

        let report = run_to_fixed_point(&mut playfield).unwrap();

        // (0,0) fires first; (0,2) then counts the mark among two unrevealed cells
        assert_eq!(report.marks, vec![(0, 1)]);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.grid[(1, 2)], Cell::Unknown);
    }

    #[test]
    fn chained_deductions_follow_scan_order() {
        let mut playfield = MemoryPlayfield::new(grid("# 1 . 2 #\n. . . # ."));

        let report = run_to_fixed_point(&mut playfield).unwrap();

        assert_eq!(report.marks, vec![(0, 0), (0, 4), (1, 3)]);
        assert_eq!(report.rounds, 2);
        assert!(is_fixed_point(&report.grid));
    }

    #[test]
    fn fixed_point_is_idempotent() {
        let mut playfield = MemoryPlayfield::new(grid("# # #\n# 8 #\n# # #"));
        let first = run_to_fixed_point(&mut playfield).unwrap();

        let second = run_to_fixed_point(&mut playfield).unwrap();

        assert_eq!(first.marks.len(), 8);
        assert!(second.marks.is_empty());
        assert_eq!(second.grid, first.grid);
    }

    #[test]
    fn reobservation_replaces_grid() {
        let frames = vec![
            grid("1 #\n. ."),
            // the game cascaded after the mark and revealed a new clue
            grid("1 *\n1 #"),
        ];
        let mut playfield = Scripted::new(frames);

        let report = run_to_fixed_point(&mut playfield).unwrap();

        assert_eq!(report.marks, vec![(0, 1)]);
        assert_eq!(report.grid[(1, 0)], Cell::Revealed(1));
        assert_eq!(playfield.settles, 1);
    }

    #[test]
    fn forgotten_mine_is_carried_over() {
        let frames = vec![grid("1 #\n. ."), grid("1 #\n. .")];
        let mut playfield = Scripted::new(frames);

        let report = run_to_fixed_point(&mut playfield).unwrap();

        assert_eq!(report.marks, vec![(0, 1)]);
        assert_eq!(report.grid[(0, 1)], Cell::Mine);
    }

    #[test]
    fn resized_snapshot_is_fatal() {
        let frames = vec![grid("1 #\n. ."), grid("1 # #\n. . .")];
        let mut playfield = Scripted::new(frames);

        let err = run_to_fixed_point(&mut playfield).unwrap_err();

        assert!(matches!(err, SweepError::MalformedSnapshot { .. }));
        assert_eq!(playfield.marks, vec![(0, 1)]);
    }

    #[test]
    fn identical_observations_give_identical_marks() {
        let frames = || {
            vec![
                grid("# 1 . 1 #\n. . . . ."),
                grid("* 1 . 1 #\n. . . . ."),
                grid("* 1 . 1 *\n. . . . ."),
            ]
        };

        let mut first = Scripted::new(frames());
        let mut second = Scripted::new(frames());
        run_to_fixed_point(&mut first).unwrap();
        run_to_fixed_point(&mut second).unwrap();

        assert_eq!(first.marks, vec![(0, 0), (0, 4)]);
        assert_eq!(first.marks, second.marks);
    }

    #[test]
    fn report_survives_json() {
        let report = run_to_fixed_point(MemoryPlayfield::new(grid("3 #\n# #"))).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();

        assert_eq!(back.marks, vec![(0, 1), (1, 0), (1, 1)]);
        assert_eq!(back, report);
    }

    #[test]
    fn observation_failure_propagates() {
        let mut playfield = Scripted::new(vec![grid("1 #")]);

        let err = run_to_fixed_point(&mut playfield).unwrap_err();

        assert!(matches!(err, SweepError::Desktop(_)));
    }

    #[test]
    fn marks_are_sound_on_random_boards() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let size = (rng.random_range(1..10), rng.random_range(1..10));
            let mines = rng.random_range(0..=mult(size.0, size.1) / 3);
            let layout = RandomLayoutGenerator::new(rng.random(), (0, 0), StartTile::Random)
                .generate(GameConfig::new(size, mines));

            // reveal a random subset of safe cells
            let mut cells = Vec::new();
            for coords in Grid::new(size).iter_coords() {
                let cell = if !layout.contains_mine(coords) && rng.random_bool(0.6) {
                    Cell::from_count(layout.adjacent_mine_count(coords)).unwrap()
                } else {
                    Cell::Unknown
                };
                cells.push(cell);
            }
            let view = Grid::from_cells(
                ndarray::Array2::from_shape_vec(size.to_nd_index(), cells).unwrap(),
            )
            .unwrap();

            let report = run_to_fixed_point(MemoryPlayfield::new(view)).unwrap();

            for coords in report.marks {
                assert!(layout.contains_mine(coords), "{:?} is not a mine", coords);
            }
            assert!(is_fixed_point(&report.grid));
        }
    }
}
