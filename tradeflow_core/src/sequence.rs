//! Route sequence controller.
//!
//! Drives the fly-in, then for every consecutive pair of stops draws the
//! arc while the camera rides its tip, settles the camera over the arrival
//! and dwells. Every suspension point of a run shares one [`CancelScope`],
//! a child of the controller's session token, so a single `cancel()`
//! resolves whatever the run is parked on and the run unwinds without
//! touching the scene again until it tears down.

use crate::arc_path::{ArcPathBuilder, ArcSample};
use crate::arc_renderer::IncrementalArcRenderer;
use crate::camera::{CameraChoreographer, CameraPlacement};
use crate::config::ChoreographyConfig;
use crate::error::{ConfigError, SequenceError};
use crate::observer::SequenceObserver;
use crate::resolver::{LocationResolver, ResolvedLocation};
use crate::route::RouteStep;
use crate::scene::Scene;
use crate::sphere::{ease_in_out, GeoPoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tradeflow_env::{AnimationContext, CancelScope, CancellationToken, Flow, RunId};

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePhase {
    /// Waiting for a route
    Loading,
    /// Route resolved and validated
    Ready,
    /// Animating
    Running,
    /// Every leg drawn, free roam re-enabled
    Done,
    /// Torn down; `reset()` before reuse
    Cancelled,
}

impl std::fmt::Display for SequencePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SequencePhase::Loading => "LOADING",
            SequencePhase::Ready => "READY",
            SequencePhase::Running => "RUNNING",
            SequencePhase::Done => "DONE",
            SequencePhase::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// How a run ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// A stop that could only be placed at the fallback coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    /// Index of the stop in the route
    pub index: usize,
    /// Name that failed to resolve
    pub name: String,
}

impl std::fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stop {} '{}' has no known location", self.index, self.name)
    }
}

/// Cancels the controller's session from outside the run.
///
/// Cheap to clone and safe to use from another task.
#[derive(Debug, Clone)]
pub struct SequenceHandle {
    token: CancellationToken,
}

impl SequenceHandle {
    /// Tears down the current run. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A route stop with its resolved location.
#[derive(Debug, Clone)]
pub struct ResolvedStop {
    pub step: RouteStep,
    pub location: ResolvedLocation,
}

impl ResolvedStop {
    pub fn point(&self) -> GeoPoint {
        self.location.point
    }
}

/// Orchestrates one route sequence at a time.
///
/// `run` takes `&mut self`, so two runs can never share the renderer's
/// buffer; a second run needs the first one to have returned.
pub struct SequenceController<C, S, O>
where
    C: AnimationContext,
    S: Scene,
    O: SequenceObserver,
{
    /// Clock and frame source
    ctx: Arc<C>,

    /// Render sink
    scene: S,

    /// Notification sink
    observer: O,

    config: ChoreographyConfig,

    builder: ArcPathBuilder,

    renderer: IncrementalArcRenderer,

    camera: CameraChoreographer,

    phase: SequencePhase,

    /// Resolved stops of the prepared route
    stops: Vec<ResolvedStop>,

    /// Precomputed arc for each consecutive pair of stops
    legs: Vec<Vec<ArcSample>>,

    /// Stops that fell back to the placeholder coordinate
    issues: Vec<DataQualityIssue>,

    /// Parent of every run scope; cancelled on teardown
    session: CancellationToken,

    /// Scope of the most recent run
    scope: Option<CancelScope>,

    /// Number of runs started, used to derive run ids
    runs: u64,

    run_id: Option<RunId>,
}

impl<C, S, O> SequenceController<C, S, O>
where
    C: AnimationContext,
    S: Scene,
    O: SequenceObserver,
{
    /// Creates a controller in `LOADING`.
    ///
    /// The buffer is allocated here, once, at `config.buffer_capacity`
    /// points.
    pub fn new(ctx: Arc<C>, scene: S, observer: O, config: ChoreographyConfig) -> Self {
        let mut controller = Self {
            ctx,
            scene,
            observer,
            builder: ArcPathBuilder::new(config.buffer_capacity),
            renderer: IncrementalArcRenderer::new(
                config.buffer_capacity,
                config.indicator_scale,
                config.trail_samples,
            ),
            camera: CameraChoreographer::new(config.track_base_altitude, config.track_altitude_gain),
            config,
            phase: SequencePhase::Loading,
            stops: Vec::new(),
            legs: Vec::new(),
            issues: Vec::new(),
            session: CancellationToken::new(),
            scope: None,
            runs: 0,
            run_id: None,
        };
        controller.observer.on_phase_changed(SequencePhase::Loading);
        controller
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn config(&self) -> &ChoreographyConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn renderer(&self) -> &IncrementalArcRenderer {
        &self.renderer
    }

    pub fn camera(&self) -> &CameraChoreographer {
        &self.camera
    }

    /// Resolved stops of the prepared route.
    pub fn stops(&self) -> &[ResolvedStop] {
        &self.stops
    }

    /// Stops placed at the fallback coordinate during `prepare`.
    pub fn data_quality_issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    pub fn trails_baked(&self) -> usize {
        self.renderer.trails_baked()
    }

    /// Frame/delay waits still parked on the latest run's scope.
    pub fn pending(&self) -> usize {
        self.scope.as_ref().map_or(0, CancelScope::pending)
    }

    /// Id of the latest run, if one has started.
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Returns a handle that tears the session down from elsewhere.
    pub fn handle(&self) -> SequenceHandle {
        SequenceHandle {
            token: self.session.clone(),
        }
    }

    /// Consumes the controller, returning its scene and observer.
    pub fn into_parts(self) -> (S, O) {
        (self.scene, self.observer)
    }

    /// Validates the configuration, resolves every stop and precomputes
    /// the arcs, then moves to `READY`.
    ///
    /// On error nothing changes: the phase, route and scene are as before
    /// and no frame has been requested.
    pub fn prepare<R>(&mut self, steps: Vec<RouteStep>, resolver: &mut R) -> Result<(), SequenceError>
    where
        R: LocationResolver + ?Sized,
    {
        match self.phase {
            SequencePhase::Cancelled => return Err(SequenceError::TornDown),
            SequencePhase::Running => return Err(SequenceError::AlreadyRunning),
            SequencePhase::Done => return Err(SequenceError::Finished),
            _ => {}
        }
        self.config.validate()?;
        if steps.len() < 2 {
            return Err(ConfigError::RouteTooShort { len: steps.len() }.into());
        }

        let mut issues = Vec::new();
        let stops: Vec<ResolvedStop> = steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| {
                let location = resolver.resolve(&step.origin);
                if location.is_fallback() {
                    warn!("No location for '{}' (stop {}), using {}", step.origin, index, location.point);
                    issues.push(DataQualityIssue {
                        index,
                        name: step.origin.clone(),
                    });
                }
                ResolvedStop { step, location }
            })
            .collect();

        let legs = stops
            .windows(2)
            .map(|pair| {
                self.builder.build(
                    pair[0].point(),
                    pair[1].point(),
                    self.config.arc_samples,
                    self.config.arc_peak,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Route prepared: {} stops, {} legs, {} unresolved",
            stops.len(),
            legs.len(),
            issues.len()
        );
        self.stops = stops;
        self.legs = legs;
        self.issues = issues;
        self.set_phase(SequencePhase::Ready);
        Ok(())
    }

    /// Runs the prepared route to completion or until the session is
    /// cancelled.
    ///
    /// A cancelled run resets the live arc, re-enables free roam and ends
    /// in `CANCELLED`; it returns `Ok(RunOutcome::Cancelled)`.
    pub async fn run(&mut self) -> Result<RunOutcome, SequenceError> {
        if self.session.is_cancelled() {
            self.teardown();
            return Err(SequenceError::TornDown);
        }
        if self.phase != SequencePhase::Ready {
            return Err(SequenceError::NotReady { phase: self.phase });
        }

        let run_id = RunId::from_seed(self.ctx.seed().wrapping_add(self.runs));
        self.runs += 1;
        self.run_id = Some(run_id);
        let scope = CancelScope::child_of(&self.session);
        self.scope = Some(scope.clone());

        info!("[{}] Run started: {} legs", run_id, self.legs.len());
        self.scene.set_free_roam(false);
        self.set_phase(SequencePhase::Running);

        match self.drive(&scope).await {
            Flow::Continue => {
                self.set_phase(SequencePhase::Done);
                self.observer
                    .on_status_changed("All routes mapped - free roam enabled");
                self.scene.set_free_roam(true);
                info!(
                    "[{}] Run complete at {:.2}s, {} trails",
                    run_id,
                    self.ctx.now().as_secs_f64(),
                    self.renderer.trails_baked()
                );
                Ok(RunOutcome::Completed)
            }
            Flow::Cancelled => {
                info!("[{}] Run cancelled at {:.2}s", run_id, self.ctx.now().as_secs_f64());
                self.teardown();
                Ok(RunOutcome::Cancelled)
            }
        }
    }

    /// Cancels the session and releases the live arc.
    ///
    /// Reachable from any phase. Ends in `CANCELLED`.
    pub fn teardown(&mut self) {
        self.session.cancel();
        self.renderer.reset();
        self.renderer.present(&mut self.scene);
        self.scene.set_free_roam(true);
        self.set_phase(SequencePhase::Cancelled);
    }

    /// Returns to `LOADING` with a fresh session, dropping the prepared
    /// route. Baked trails stay in the scene.
    pub fn reset(&mut self) {
        self.session.cancel();
        self.session = CancellationToken::new();
        self.scope = None;
        self.stops.clear();
        self.legs.clear();
        self.issues.clear();
        self.renderer.reset();
        self.renderer.present(&mut self.scene);
        self.set_phase(SequencePhase::Loading);
    }

    fn set_phase(&mut self, phase: SequencePhase) {
        if self.phase == phase {
            return;
        }
        debug!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.observer.on_phase_changed(phase);
    }

    async fn drive(&mut self, scope: &CancelScope) -> Flow {
        let ctx = Arc::clone(&self.ctx);
        let first = self.stops[0].point();

        let fly_in = self.camera.transition(
            &*ctx,
            scope,
            &mut self.scene,
            self.config.home_placement(),
            CameraPlacement::at_altitude(first, self.config.cruise_altitude),
            self.config.fly_in(),
        );
        if fly_in.await.is_cancelled() {
            return Flow::Cancelled;
        }
        self.announce_arrival(0);
        if scope.delay(&*ctx, self.config.initial_dwell()).await.is_cancelled() {
            return Flow::Cancelled;
        }

        for leg in 0..self.legs.len() {
            if self.fly_leg(&*ctx, scope, leg).await.is_cancelled() {
                return Flow::Cancelled;
            }
        }
        Flow::Continue
    }

    /// Draws leg `leg` (stop `leg` to stop `leg + 1`), settles and dwells.
    async fn fly_leg(&mut self, ctx: &C, scope: &CancelScope, leg: usize) -> Flow {
        let from = self.stops[leg].point();
        let to = self.stops[leg + 1].point();
        let status = format!(
            "{} -> {}",
            self.stops[leg].step.origin,
            self.stops[leg + 1].step.origin
        );
        self.observer.on_status_changed(&status);
        debug!("Leg {}: {} -> {}", leg, from, to);

        self.renderer.begin();
        self.renderer.present(&mut self.scene);

        let samples = &self.legs[leg];
        let last = samples.len() - 1;
        let total = self.config.arc_duration().as_secs_f64();
        let mut start = None;
        loop {
            let Some(now) = scope.next_frame(ctx).await else {
                return Flow::Cancelled;
            };
            // One timestamp per frame feeds both the reveal and the camera
            let t0 = *start.get_or_insert(now);
            let raw = (now.saturating_sub(t0).as_secs_f64() / total).min(1.0);
            let index = ((ease_in_out(raw) * last as f64).floor() as usize).min(last);

            self.renderer.reveal_up_to(samples, index);
            self.renderer
                .place_indicator(&samples[index], &samples[index.saturating_sub(1)]);
            self.renderer.present(&mut self.scene);
            self.camera.track_arc_tip(&mut self.scene, &samples[index]);

            if raw >= 1.0 {
                break;
            }
        }
        let settle_from = self.camera.tip_placement(&samples[last]);

        self.renderer
            .bake_trail(&mut self.scene, from, to, self.config.arc_peak);
        self.renderer.reset();
        self.renderer.present(&mut self.scene);
        self.announce_arrival(leg + 1);

        let settle = self.camera.transition(
            ctx,
            scope,
            &mut self.scene,
            settle_from,
            CameraPlacement::at_altitude(to, self.config.cruise_altitude),
            self.config.settle(),
        );
        if settle.await.is_cancelled() {
            return Flow::Cancelled;
        }
        scope.delay(ctx, self.config.dwell()).await
    }

    /// Highlight, step, label and status for arriving at stop `index`.
    fn announce_arrival(&mut self, index: usize) {
        let stop = &self.stops[index];
        let role = stop.step.role;
        let label_at = GeoPoint::new(stop.point().lat + self.config.label_lat_offset, stop.point().lng);
        let status = if stop.step.material.is_empty() {
            stop.step.origin.clone()
        } else {
            format!("{} - {}", stop.step.origin, stop.step.material)
        };

        self.observer.on_country_highlighted(&stop.step.origin, role);
        self.observer.on_step_changed(index);
        self.observer
            .on_label_added(label_at, &stop.step.label(), role.label_color());
        self.observer.on_status_changed(&status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{RecordingObserver, SequenceEvent};
    use crate::resolver::StaticGazetteer;
    use crate::route::Role;
    use crate::scene::{CameraPose, HeadlessScene, IndicatorPose, Scene, Trail};
    use nalgebra::Point3;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tradeflow_env::TokioContext;

    type TestController = SequenceController<TokioContext, HeadlessScene, RecordingObserver>;

    fn three_stops() -> Vec<RouteStep> {
        vec![
            RouteStep::new("China", Role::Exporter).with_material("Lithium", "2836.91"),
            RouteStep::new("USA", Role::Importer).with_material("Lithium", "2836.91"),
            RouteStep::new("Brazil", Role::Importer).with_material("Lithium", "2836.91"),
        ]
    }

    fn controller() -> TestController {
        SequenceController::new(
            TokioContext::shared(),
            HeadlessScene::new(),
            RecordingObserver::new(),
            ChoreographyConfig::default(),
        )
    }

    fn prepared() -> TestController {
        let mut controller = controller();
        controller
            .prepare(three_stops(), &mut StaticGazetteer::builtin())
            .unwrap();
        controller
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_route_end_to_end() {
        let mut controller = prepared();
        assert_eq!(controller.run().await.unwrap(), RunOutcome::Completed);

        let observer = controller.observer();
        assert_eq!(observer.step_indices(), vec![0, 1, 2]);
        assert_eq!(
            observer.phases(),
            vec![
                SequencePhase::Loading,
                SequencePhase::Ready,
                SequencePhase::Running,
                SequencePhase::Done
            ]
        );
        assert_eq!(observer.highlights(), vec!["China", "USA", "Brazil"]);
        assert_eq!(controller.trails_baked(), 2);
        assert_eq!(controller.scene().trails.len(), 2);
        assert!(controller.scene().free_roam);
        assert_eq!(controller.renderer().visible(), 0);
        assert_eq!(controller.pending(), 0);
        assert!(controller.data_quality_issues().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_camera_rides_arc_tip() {
        let mut controller = prepared();
        controller.run().await.unwrap();
        assert!(controller.scene().max_tip_drift < 1e-4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_labels_sit_above_their_stop() {
        let mut controller = prepared();
        controller.run().await.unwrap();

        let china = controller.stops()[0].point();
        let label = controller.observer().events.iter().find_map(|e| match e {
            SequenceEvent::Label { point, text, color } => Some((*point, text.clone(), color.clone())),
            _ => None,
        });
        let (point, text, color) = label.unwrap();
        assert!((point.lat - (china.lat + 3.0)).abs() < 1e-9);
        assert_eq!(text, "[EXP] China");
        assert_eq!(color, "#00ff78");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_stop_is_refused() {
        let mut controller = controller();
        let err = controller.prepare(
            vec![RouteStep::new("China", Role::Exporter)],
            &mut StaticGazetteer::builtin(),
        );
        assert!(matches!(
            err,
            Err(SequenceError::Config(ConfigError::RouteTooShort { len: 1 }))
        ));
        assert_eq!(controller.phase(), SequencePhase::Loading);

        let run = controller.run().await;
        assert!(matches!(
            run,
            Err(SequenceError::NotReady {
                phase: SequencePhase::Loading
            })
        ));
        assert_eq!(controller.scene().camera_updates, 0);
        assert_eq!(controller.scene().arc_syncs, 0);
        assert_eq!(controller.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_arc_fails_before_animating() {
        let mut controller = SequenceController::new(
            TokioContext::shared(),
            HeadlessScene::new(),
            RecordingObserver::new(),
            ChoreographyConfig {
                arc_samples: 500,
                ..Default::default()
            },
        );
        let err = controller.prepare(three_stops(), &mut StaticGazetteer::builtin());
        assert!(matches!(
            err,
            Err(SequenceError::Config(ConfigError::SampleCountExceedsCapacity { .. }))
        ));
        assert_eq!(controller.scene().camera_updates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_arc() {
        let mut controller = prepared();
        let handle = controller.handle();

        // First arc starts about 3.03s in (fly-in plus initial dwell) and
        // takes 2.6s; 4.1s is about 40% of the way along.
        let (outcome, ()) = tokio::join!(controller.run(), async {
            tokio::time::sleep(Duration::from_millis(4100)).await;
            handle.cancel();
        });

        assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
        assert_eq!(controller.phase(), SequencePhase::Cancelled);
        assert_eq!(controller.observer().step_indices(), vec![0]);
        assert_eq!(controller.renderer().visible(), 0);
        assert_eq!(controller.scene().visible, 0);
        assert!(!controller.scene().arc_shown);
        assert!(controller.scene().free_roam);
        assert_eq!(controller.trails_baked(), 0);
        assert_eq!(controller.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_dwell_emits_nothing_more() {
        let mut controller = prepared();
        let handle = controller.handle();

        // Inside the dwell after the first arrival
        let (outcome, ()) = tokio::join!(controller.run(), async {
            tokio::time::sleep(Duration::from_millis(7000)).await;
            handle.cancel();
        });

        assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
        assert_eq!(controller.observer().step_indices(), vec![0, 1]);
        assert_eq!(controller.trails_baked(), 1);
        assert_eq!(
            controller.observer().phases().last(),
            Some(&SequencePhase::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_torn_down_controller_needs_reset() {
        let mut controller = prepared();
        controller.teardown();
        assert!(matches!(controller.run().await, Err(SequenceError::TornDown)));

        controller.reset();
        assert_eq!(controller.phase(), SequencePhase::Loading);
        controller
            .prepare(three_stops(), &mut StaticGazetteer::builtin())
            .unwrap();
        assert_eq!(controller.run().await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_controller_needs_reset() {
        let mut controller = prepared();
        controller.run().await.unwrap();

        let again = controller.prepare(three_stops(), &mut StaticGazetteer::builtin());
        assert!(matches!(again, Err(SequenceError::Finished)));
        assert_eq!(controller.phase(), SequencePhase::Done);
        assert!(matches!(
            controller.run().await,
            Err(SequenceError::NotReady {
                phase: SequencePhase::Done
            })
        ));
        assert_eq!(controller.observer().step_indices(), vec![0, 1, 2]);

        controller.reset();
        controller
            .prepare(three_stops(), &mut StaticGazetteer::builtin())
            .unwrap();
        assert_eq!(controller.phase(), SequencePhase::Ready);
    }

    /// Counts visible writes that arrive after the cancel flag is raised.
    struct LateWriteScene {
        inner: HeadlessScene,
        cancelled: Arc<AtomicBool>,
        late_writes: usize,
    }

    impl LateWriteScene {
        fn note(&mut self, visible: bool) {
            if visible && self.cancelled.load(Ordering::SeqCst) {
                self.late_writes += 1;
            }
        }
    }

    impl Scene for LateWriteScene {
        fn set_camera(&mut self, pose: &CameraPose) {
            self.note(true);
            self.inner.set_camera(pose);
        }

        fn sync_live_arc(&mut self, points: &[Point3<f32>], visible: usize, shown: bool) {
            self.note(shown);
            self.inner.sync_live_arc(points, visible, shown);
        }

        fn sync_indicator(&mut self, pose: &IndicatorPose, shown: bool) {
            self.note(shown);
            self.inner.sync_indicator(pose, shown);
        }

        fn add_trail(&mut self, trail: Trail) {
            self.note(true);
            self.inner.add_trail(trail);
        }

        fn set_free_roam(&mut self, enabled: bool) {
            self.note(!enabled);
            self.inner.set_free_roam(enabled);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_scene_writes_after_cancel() {
        // fly-in, initial dwell, first arc, settle, dwell, second arc
        for cut_ms in [1000, 2500, 3500, 4100, 5000, 5800, 7000, 11500] {
            let cancelled = Arc::new(AtomicBool::new(false));
            let scene = LateWriteScene {
                inner: HeadlessScene::new(),
                cancelled: Arc::clone(&cancelled),
                late_writes: 0,
            };
            let mut controller = SequenceController::new(
                TokioContext::shared(),
                scene,
                RecordingObserver::new(),
                ChoreographyConfig::default(),
            );
            controller
                .prepare(three_stops(), &mut StaticGazetteer::builtin())
                .unwrap();
            let handle = controller.handle();

            let (outcome, ()) = tokio::join!(controller.run(), async {
                tokio::time::sleep(Duration::from_millis(cut_ms)).await;
                cancelled.store(true, Ordering::SeqCst);
                handle.cancel();
            });

            assert_eq!(outcome.unwrap(), RunOutcome::Cancelled, "cut at {}ms", cut_ms);
            let scene = controller.scene();
            assert_eq!(scene.late_writes, 0, "cut at {}ms", cut_ms);
            assert!(scene.inner.arc_syncs > 0 || cut_ms < 3000, "cut at {}ms", cut_ms);
            assert!(!scene.inner.arc_shown);
            assert!(scene.inner.free_roam);
            assert_eq!(controller.pending(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_stop_is_flagged() {
        let mut controller = controller();
        let steps = vec![
            RouteStep::new("China", Role::Exporter),
            RouteStep::new("Atlantis", Role::Importer),
        ];
        controller
            .prepare(steps, &mut StaticGazetteer::builtin())
            .unwrap();

        let issues = controller.data_quality_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[0].name, "Atlantis");
        assert!(controller.stops()[1].location.is_fallback());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SequencePhase::Running.to_string(), "RUNNING");
    }
}
