//! Best-first search for box configurations that stack better.
//!
//! Starting from the live configuration, the improver repeatedly takes the
//! unexplored state whose stackability is closest to the target, asks the
//! hot-spot provider where it is limited, and tries small moves and face
//! pushes of the hot parts. Candidates that overflow the bounding-box
//! constraint or duplicate a known state are dropped; the rest are queued,
//! and those reaching the target are kept as solutions.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stacker_math::{Aabb3, Tolerance, Vec3};
use stacker_primitive::{Box3, FaceId};
use tracing::{debug, info};

use crate::controller::Controller;
use crate::error::{Result, SearchError};
use crate::evaluator::{HotSpotProvider, StackabilityEvaluator};
use crate::settings::ImproverSettings;
use crate::state::{PartId, ShapeState};

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The requested number of solutions was found.
    Converged,
    /// Every reachable state was explored.
    QueueExhausted,
    /// The expansion cap passed to [`Improver::execute`] was reached.
    LevelReached,
    /// The wall-clock budget ran out.
    BudgetExhausted,
    /// Zero solutions were requested.
    NothingRequested,
}

/// Result of one search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Solutions, best first.
    pub solutions: Vec<ShapeState>,
    /// States that were expanded, in expansion order.
    pub used_candidates: Vec<ShapeState>,
    /// Stackability of the configuration the search started from.
    pub original_stackability: Option<f64>,
    /// Number of expansions performed.
    pub expansions: usize,
    /// Why the search stopped.
    pub termination: Termination,
}

impl SearchOutcome {
    fn nothing_requested() -> Self {
        Self {
            solutions: Vec::new(),
            used_candidates: Vec::new(),
            original_stackability: None,
            expansions: 0,
            termination: Termination::NothingRequested,
        }
    }

    /// The best solution, if any.
    pub fn best(&self) -> Option<&ShapeState> {
        self.solutions.first()
    }
}

/// Queue entry; the heap pops the lowest energy, then the lowest bounding
/// box deviation, then the earliest generated.
#[derive(Debug)]
struct QueuedState {
    state: ShapeState,
    seq: u64,
}

impl Ord for QueuedState {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .state
            .energy()
            .total_cmp(&self.state.energy())
            .then_with(|| {
                other
                    .state
                    .bb_deviation()
                    .total_cmp(&self.state.bb_deviation())
            })
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedState {}

/// An evaluated candidate and the bounds of its mesh.
struct Candidate {
    state: ShapeState,
    bounds: Aabb3,
}

/// Best-first stackability search over a controller's part boxes.
pub struct Improver<'a> {
    controller: &'a Controller,
    evaluator: &'a dyn StackabilityEvaluator,
    hot_spots: &'a dyn HotSpotProvider,
    settings: ImproverSettings,
    constraint: Aabb3,
    queue: BinaryHeap<QueuedState>,
    used_candidates: Vec<ShapeState>,
    solutions: Vec<ShapeState>,
    seq: u64,
}

impl<'a> Improver<'a> {
    /// Search around the current configuration of `controller`.
    ///
    /// The bounding-box constraint defaults to the controller's current
    /// mesh bounds.
    pub fn new(
        controller: &'a Controller,
        evaluator: &'a dyn StackabilityEvaluator,
        hot_spots: &'a dyn HotSpotProvider,
        settings: ImproverSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            controller,
            evaluator,
            hot_spots,
            settings,
            constraint: controller.mesh().current_bounds(),
            queue: BinaryHeap::new(),
            used_candidates: Vec::new(),
            solutions: Vec::new(),
            seq: 0,
        })
    }

    /// Use `constraint` as the bounds candidates must stay within.
    pub fn with_constraint(mut self, constraint: Aabb3) -> Self {
        self.constraint = constraint;
        self
    }

    /// Settings in use.
    pub fn settings(&self) -> &ImproverSettings {
        &self.settings
    }

    /// Bounds candidates must stay within.
    pub fn constraint(&self) -> Aabb3 {
        self.constraint
    }

    /// Absolute distance under which two states count as the same.
    pub fn uniqueness_distance(&self) -> f64 {
        self.settings.uniqueness_threshold * self.constraint.diagonal()
    }

    /// True if `bounds` stick out of the constraint by at most `bb_tolerance`.
    pub fn satisfy_bb_constraint(&self, bounds: &Aabb3) -> bool {
        self.constraint.relative_overflow(bounds) <= self.settings.bb_tolerance
    }

    /// True if `state` differs from every solution, queued state and
    /// explored state by more than the uniqueness distance.
    pub fn is_unique(&self, state: &ShapeState) -> bool {
        let threshold = self.uniqueness_distance();
        let far = |other: &ShapeState| state.distance(other) > threshold;
        self.solutions.iter().all(far)
            && self.queue.iter().all(|q| far(&q.state))
            && self.used_candidates.iter().all(far)
    }

    fn is_explored(&self, state: &ShapeState) -> bool {
        let threshold = self.uniqueness_distance();
        self.used_candidates
            .iter()
            .any(|used| state.distance(used) <= threshold)
    }

    fn is_solution(&self, state: &ShapeState, bounds: &Aabb3) -> bool {
        state.stackability() >= self.settings.target_stackability
            && state.bb_deviation() <= self.settings.bb_tolerance
            && self.satisfy_bb_constraint(bounds)
    }

    fn push(&mut self, state: ShapeState) {
        self.queue.push(QueuedState {
            state,
            seq: self.seq,
        });
        self.seq += 1;
    }

    /// Run the search.
    ///
    /// `level` caps the number of expansions; `None` searches until
    /// convergence, exhaustion or the time budget.
    pub fn execute(mut self, level: Option<usize>) -> Result<SearchOutcome> {
        if self.settings.num_expected_solutions == 0 {
            info!("No solutions requested, skipping search");
            return Ok(SearchOutcome::nothing_requested());
        }

        let start = Instant::now();
        let budget = self.settings.time_budget_secs.map(Duration::from_secs_f64);
        let target = self.settings.target_stackability;

        let controller = self.controller;
        let mesh = controller.mesh();
        let root = ShapeState::new(
            controller.snapshot(),
            self.evaluator.evaluate(mesh),
            target,
        );
        let original_stackability = root.stackability();
        info!(
            stackability = original_stackability,
            target,
            expected = self.settings.num_expected_solutions,
            "Starting improver"
        );
        if self.is_solution(&root, &mesh.current_bounds()) {
            self.solutions.push(root.clone());
        }
        self.push(root);

        let mut expansions = 0;
        let termination = loop {
            if self.solutions.len() >= self.settings.num_expected_solutions {
                break Termination::Converged;
            }
            if level.is_some_and(|cap| expansions >= cap) {
                break Termination::LevelReached;
            }
            if budget.is_some_and(|b| start.elapsed() >= b) {
                break Termination::BudgetExhausted;
            }
            let Some(current) = self.pop_unexplored() else {
                break Termination::QueueExhausted;
            };

            let candidates = self.expand(&current)?;
            self.used_candidates.push(current);
            expansions += 1;

            let generated = candidates.len();
            let mut queued = 0;
            for Candidate { state, bounds } in candidates {
                if !self.satisfy_bb_constraint(&bounds) || !self.is_unique(&state) {
                    continue;
                }
                if self.is_solution(&state, &bounds) {
                    self.solutions.push(state.clone());
                }
                self.push(state);
                queued += 1;
            }
            debug!(
                expansion = expansions,
                generated,
                queued,
                pending = self.queue.len(),
                solutions = self.solutions.len(),
                "Expanded candidate"
            );
        };

        self.solutions.sort_by(|a, b| {
            a.energy()
                .total_cmp(&b.energy())
                .then_with(|| a.bb_deviation().total_cmp(&b.bb_deviation()))
        });
        self.solutions.truncate(self.settings.num_expected_solutions);

        info!(
            ?termination,
            expansions,
            solutions = self.solutions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Improver finished"
        );
        Ok(SearchOutcome {
            solutions: self.solutions,
            used_candidates: self.used_candidates,
            original_stackability: Some(original_stackability),
            expansions,
            termination,
        })
    }

    fn pop_unexplored(&mut self) -> Option<ShapeState> {
        while let Some(QueuedState { state, .. }) = self.queue.pop() {
            if !self.is_explored(&state) {
                return Some(state);
            }
        }
        None
    }

    /// Evaluate every local variation of the hot parts of `state`, in
    /// generation order.
    fn expand(&self, state: &ShapeState) -> Result<Vec<Candidate>> {
        let mut working = self.controller.clone();
        working.apply_state(state)?;
        let spots = self.hot_spots.hot_spots(&working, working.mesh());

        let mut jobs: Vec<(PartId, Box3)> = Vec::new();
        for spot in &spots {
            let base = *working.primitive(spot.part)?.current_box();
            for side in spot.sides() {
                for b in local_boxes(&base, side, &self.settings) {
                    let job = (spot.part, b);
                    if !jobs.contains(&job) {
                        jobs.push(job);
                    }
                }
            }
        }

        let evaluate =
            |(part, b): &(PartId, Box3)| self.evaluate_candidate(&working, state, *part, b);
        if self.settings.parallel {
            jobs.par_iter().map(evaluate).collect()
        } else {
            jobs.iter().map(evaluate).collect()
        }
    }

    fn evaluate_candidate(
        &self,
        working: &Controller,
        state: &ShapeState,
        part: PartId,
        b: &Box3,
    ) -> Result<Candidate> {
        let mut mesh = working.mesh().clone();
        let segment = mesh
            .segment_mut(part.0)
            .ok_or(SearchError::MissingPart(part))?;
        working.primitive(part)?.write_positions(b, segment)?;
        mesh.update();

        let mut boxes = state.boxes().clone();
        boxes.insert(part, *b);
        let evaluation = self.evaluator.evaluate(&mesh);
        Ok(Candidate {
            state: ShapeState::new(boxes, evaluation, self.settings.target_stackability),
            bounds: mesh.bounds(),
        })
    }
}

/// Translations along the box axes, identity first.
fn local_moves(base: &Box3, settings: &ImproverSettings) -> Vec<Vec3> {
    let tol = Tolerance::DEFAULT;
    let mut moves = vec![Vec3::zeros()];
    for axis in 0..3 {
        if tol.is_zero(base.extent[axis]) {
            continue;
        }
        for k in 1..=settings.local_radius {
            let d = f64::from(k) * settings.step_fraction * base.extent[axis];
            moves.push(base.axes[axis] * d);
            moves.push(base.axes[axis] * -d);
        }
    }
    moves
}

/// Distances to push `side` outward (positive) or pull it in, zero first.
fn local_pushes(base: &Box3, side: FaceId, settings: &ImproverSettings) -> Vec<f64> {
    let tol = Tolerance::DEFAULT;
    let extent = base.extent[side.axis()];
    let mut pushes = vec![0.0];
    if tol.is_zero(extent) {
        return pushes;
    }
    for k in 1..=settings.local_radius {
        let d = f64::from(k) * settings.step_fraction * extent;
        pushes.push(d);
        if extent - d * 0.5 > tol.linear {
            pushes.push(-d);
        }
    }
    pushes
}

/// Every non-identity combination of a move and a push of `side`.
///
/// A push moves `side` by the given distance while the opposite face
/// stays put.
fn local_boxes(base: &Box3, side: FaceId, settings: &ImproverSettings) -> Vec<Box3> {
    let moves = local_moves(base, settings);
    let pushes = local_pushes(base, side, settings);
    let axis = side.axis();
    let mut boxes = Vec::with_capacity(moves.len() * pushes.len());
    for mv in &moves {
        for &push in &pushes {
            if push == 0.0 && *mv == Vec3::zeros() {
                continue;
            }
            let mut b = *base;
            b.translate(mv);
            b.extent[axis] += push * 0.5;
            b.translate(&(b.axes[axis] * (side.sign() * push * 0.5)));
            boxes.push(b);
        }
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluation;
    use crate::hotspot::{HotSide, HotSpot};
    use approx::assert_relative_eq;
    use stacker_math::Point3;
    use stacker_primitive::{AxisAlignedFitter, PartMesh, SegMesh};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Stackability grows as part 0 moves toward +x.
    #[derive(Default)]
    struct SlideRight {
        calls: AtomicUsize,
    }

    impl StackabilityEvaluator for SlideRight {
        fn evaluate(&self, mesh: &SegMesh) -> Evaluation {
            self.calls.fetch_add(1, AtomicOrdering::Relaxed);
            let x = mesh
                .segment(0)
                .map_or(0.0, |s| Aabb3::from_points(s.positions()).center().x);
            Evaluation {
                stackability: (0.5 + 0.25 * x).clamp(0.0, 1.0),
                bb_deviation: 0.0,
            }
        }
    }

    /// Like [`SlideRight`], but always reports a large bounding-box deviation.
    struct SlideRightOverflowing;

    impl StackabilityEvaluator for SlideRightOverflowing {
        fn evaluate(&self, mesh: &SegMesh) -> Evaluation {
            Evaluation {
                bb_deviation: 5.0,
                ..SlideRight::default().evaluate(mesh)
            }
        }
    }

    /// The same hot spots whatever the configuration.
    struct Fixed(Vec<HotSpot>);

    impl HotSpotProvider for Fixed {
        fn hot_spots(&self, _: &Controller, _: &SegMesh) -> Vec<HotSpot> {
            self.0.clone()
        }
    }

    fn plus_x_spot() -> Fixed {
        Fixed(vec![HotSpot {
            part: PartId(0),
            face: FaceId::from_axis(0, true),
            side: HotSide::Upper,
            samples: vec![Point3::new(0.5, 0.0, 0.0)],
        }])
    }

    fn controller() -> Controller {
        let mesh = SegMesh::new(
            "pair",
            vec![
                PartMesh::cuboid("slider", Point3::origin(), [0.5, 0.5, 0.5]),
                PartMesh::cuboid("base", Point3::new(0.0, 0.0, -1.0), [1.0, 1.0, 0.25]),
            ],
        );
        Controller::fit(mesh, &AxisAlignedFitter).unwrap()
    }

    fn settings() -> ImproverSettings {
        ImproverSettings {
            num_expected_solutions: 3,
            bb_tolerance: 10.0,
            target_stackability: 0.6,
            local_radius: 2,
            step_fraction: 0.1,
            uniqueness_threshold: 0.001,
            time_budget_secs: None,
            parallel: false,
        }
    }

    #[test]
    fn test_zero_solutions_requested() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let outcome = Improver::new(
            &ctrl,
            &eval,
            &spots,
            ImproverSettings {
                num_expected_solutions: 0,
                ..settings()
            },
        )
        .unwrap()
        .execute(None)
        .unwrap();
        assert_eq!(outcome.termination, Termination::NothingRequested);
        assert!(outcome.solutions.is_empty());
        assert_eq!(outcome.expansions, 0);
        assert_eq!(outcome.original_stackability, None);
        assert_eq!(eval.calls.load(AtomicOrdering::Relaxed), 0);
    }

    #[test]
    fn test_converges_with_accepted_solutions() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let improver = Improver::new(&ctrl, &eval, &spots, settings()).unwrap();
        let threshold = improver.uniqueness_distance();
        let outcome = improver.execute(None).unwrap();

        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.solutions.len(), 3);
        assert_relative_eq!(outcome.original_stackability.unwrap(), 0.5, epsilon = 1e-12);
        assert!(outcome.expansions >= 2);
        for s in &outcome.solutions {
            assert!(s.stackability() >= 0.6);
            // Only the hot part moves
            assert_eq!(s.box_of(PartId(1)), ctrl.snapshot().get(&PartId(1)));
        }
        for pair in outcome.solutions.windows(2) {
            assert!(pair[0].energy() <= pair[1].energy());
        }
        for (i, a) in outcome.solutions.iter().enumerate() {
            for b in &outcome.solutions[i + 1..] {
                assert!(a.distance(b) > threshold);
            }
        }
        assert_eq!(outcome.best(), outcome.solutions.first());
    }

    #[test]
    fn test_expansion_order() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let outcome = Improver::new(&ctrl, &eval, &spots, settings())
            .unwrap()
            .execute(None)
            .unwrap();
        let used = &outcome.used_candidates;
        assert_eq!(used.len(), outcome.expansions);
        assert_eq!(used[0].boxes(), &ctrl.snapshot());
        // The root's best child is expanded next, and nothing worse than the root after it
        assert!(used[1].stackability() > used[0].stackability());
        assert!(used[1..].iter().all(|s| s.stackability() > 0.5));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let serial = Improver::new(&ctrl, &eval, &spots, settings())
            .unwrap()
            .execute(None)
            .unwrap();
        let parallel = Improver::new(
            &ctrl,
            &eval,
            &spots,
            ImproverSettings {
                parallel: true,
                ..settings()
            },
        )
        .unwrap()
        .execute(None)
        .unwrap();
        assert_eq!(serial.solutions, parallel.solutions);
        assert_eq!(serial.expansions, parallel.expansions);
    }

    #[test]
    fn test_no_hot_spots_exhausts_queue() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let outcome = Improver::new(&ctrl, &eval, &Fixed(Vec::new()), settings())
            .unwrap()
            .execute(None)
            .unwrap();
        assert_eq!(outcome.termination, Termination::QueueExhausted);
        assert_eq!(outcome.expansions, 1);
        assert!(outcome.solutions.is_empty());
    }

    #[test]
    fn test_root_already_a_solution() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let outcome = Improver::new(
            &ctrl,
            &eval,
            &Fixed(Vec::new()),
            ImproverSettings {
                num_expected_solutions: 1,
                target_stackability: 0.5,
                ..settings()
            },
        )
        .unwrap()
        .execute(None)
        .unwrap();
        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.expansions, 0);
        assert_eq!(outcome.solutions.len(), 1);
        assert_eq!(outcome.solutions[0].boxes(), &ctrl.snapshot());
    }

    #[test]
    fn test_level_cap() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let outcome = Improver::new(
            &ctrl,
            &eval,
            &spots,
            ImproverSettings {
                target_stackability: 1.0,
                ..settings()
            },
        )
        .unwrap()
        .execute(Some(2))
        .unwrap();
        assert_eq!(outcome.termination, Termination::LevelReached);
        assert_eq!(outcome.expansions, 2);
        assert_eq!(outcome.used_candidates.len(), 2);
    }

    #[test]
    fn test_time_budget() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let outcome = Improver::new(
            &ctrl,
            &eval,
            &spots,
            ImproverSettings {
                target_stackability: 1.0,
                time_budget_secs: Some(1e-9),
                ..settings()
            },
        )
        .unwrap()
        .execute(None)
        .unwrap();
        assert_eq!(outcome.termination, Termination::BudgetExhausted);
        assert_eq!(outcome.expansions, 0);
    }

    #[test]
    fn test_bb_constraint_holds_for_every_solution() {
        let ctrl = controller();
        let eval = SlideRight::default();
        let spots = plus_x_spot();
        let settings = ImproverSettings {
            bb_tolerance: 0.05,
            target_stackability: 0.52,
            ..settings()
        };
        let improver = Improver::new(&ctrl, &eval, &spots, settings).unwrap();
        let constraint = improver.constraint();
        let outcome = improver.execute(Some(20)).unwrap();
        assert!(!outcome.solutions.is_empty());
        for s in &outcome.solutions {
            let mut applied = ctrl.clone();
            applied.apply_state(s).unwrap();
            assert!(constraint.relative_overflow(&applied.mesh().current_bounds()) <= 0.05);
        }
    }

    #[test]
    fn test_solution_respects_reported_bb_deviation() {
        let ctrl = controller();
        let spots = plus_x_spot();
        let settings = ImproverSettings {
            bb_tolerance: 0.05,
            target_stackability: 0.52,
            ..settings()
        };
        let honest = Improver::new(&ctrl, &SlideRight::default(), &spots, settings.clone())
            .unwrap()
            .execute(Some(20))
            .unwrap();
        assert!(!honest.solutions.is_empty());

        let outcome = Improver::new(&ctrl, &SlideRightOverflowing, &spots, settings)
            .unwrap()
            .execute(Some(20))
            .unwrap();
        assert!(outcome.solutions.is_empty());
        assert_ne!(outcome.termination, Termination::Converged);
    }

    #[test]
    fn test_local_boxes() {
        let base = Box3::axis_aligned(Point3::origin(), [0.5, 0.5, 0.5]);
        let side = FaceId::from_axis(0, true);
        let s = settings();
        assert_eq!(local_moves(&base, &s).len(), 1 + 3 * 2 * 2);
        assert_eq!(local_pushes(&base, side, &s), vec![0.0, 0.05, -0.05, 0.1, -0.1]);

        let boxes = local_boxes(&base, side, &s);
        assert_eq!(boxes.len(), 13 * 5 - 1);
        assert!(!boxes.contains(&base));
        // A pure push moves the side face and keeps the opposite one
        let pushed = boxes
            .iter()
            .find(|b| b.extent[0] > 0.5 && b.center.y == 0.0 && b.center.z == 0.0)
            .unwrap();
        let minus_x = FaceId::from_axis(0, false);
        assert_relative_eq!(pushed.face_center(minus_x).x, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_axis_gets_no_moves() {
        let flat = Box3::axis_aligned(Point3::origin(), [1.0, 1.0, 0.0]);
        let s = settings();
        assert_eq!(local_moves(&flat, &s).len(), 1 + 2 * 2 * 2);
        assert_eq!(local_pushes(&flat, FaceId::from_axis(2, true), &s), vec![0.0]);
    }
}
