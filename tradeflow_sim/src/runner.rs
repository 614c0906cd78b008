//! Scenario runner - drives the sequence controller on a virtual clock.

use crate::context::SimContext;
use crate::exporter::{CaptureScene, SimExport};
use crate::scenarios::ScenarioId;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tradeflow_core::{
    CentroidResolver, ChoreographyConfig, ConfigError, GeoPoint, LocationResolver,
    RecordingObserver, Role, RouteStep, RunOutcome, SequenceController, SequenceError,
    SequencePhase, StaticGazetteer, GLOBE_RADIUS,
};
use tradeflow_env::AnimationContext;

/// Export every n-th camera update.
const EXPORT_EVERY: usize = 6;

/// Largest camera/tip misalignment tolerated while an arc is drawn (radians).
const MAX_TIP_DRIFT: f64 = 1e-4;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Frames delivered by the context
    pub frames: u64,

    /// Camera updates pushed to the scene
    pub camera_updates: usize,

    /// Trails baked
    pub trails: usize,

    /// `on_step_changed` notifications
    pub step_events: usize,

    /// Largest camera/tip angle while an arc was shown (radians)
    pub max_tip_drift: f64,

    /// Poses with NaN or infinite components
    pub non_finite_poses: usize,
}

/// Everything left over after one controller run.
struct RunReport {
    outcome: Result<RunOutcome, SequenceError>,
    phase: SequencePhase,
    visible: usize,
    pending: usize,
    scene: CaptureScene,
    observer: RecordingObserver,
    ctx: Arc<SimContext>,
}

impl RunReport {
    fn metrics(&self) -> ScenarioMetrics {
        ScenarioMetrics {
            frames: self.ctx.frame_count(),
            camera_updates: self.scene.inner.camera_updates,
            trails: self.scene.inner.trails.len(),
            step_events: self.observer.step_indices().len(),
            max_tip_drift: self.scene.inner.max_tip_drift,
            non_finite_poses: self.scene.non_finite,
        }
    }
}

/// Runs route scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Choreography tuning
    config: ChoreographyConfig,

    /// Route used by the route-following scenarios
    route: Option<Vec<RouteStep>>,

    /// Boundary-based resolver, if one was loaded
    centroids: Option<CentroidResolver>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: ChoreographyConfig::default(),
            route: None,
            centroids: None,
        }
    }

    /// Sets the choreography tuning.
    pub fn with_config(mut self, config: ChoreographyConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default three-stop route.
    pub fn with_route(mut self, route: Vec<RouteStep>) -> Self {
        self.route = Some(route);
        self
    }

    /// Resolves stops from country boundaries instead of the built-in table.
    pub fn with_centroids(mut self, resolver: CentroidResolver) -> Self {
        self.centroids = Some(resolver);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_exporting(scenario).0
    }

    /// Runs a scenario and also returns its frame export.
    pub fn run_exporting(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        if scenario.is_cancellation() {
            debug!("  {}", scenario.description());
        }

        let mut export = SimExport::new(scenario.name(), self.seed);
        let checked = match scenario {
            ScenarioId::FullRoute => self.run_full_route(),
            ScenarioId::SingleStop => self.run_single_stop(),
            ScenarioId::CancelMidArc => self.run_cancel_mid_arc(),
            ScenarioId::CancelDuringFlyIn => self.run_cancel_during_fly_in(),
            ScenarioId::CancelDuringDwell => self.run_cancel_during_dwell(),
            ScenarioId::PolarRoute => self.run_polar_route(),
            ScenarioId::AntipodalRoute => self.run_antipodal_route(),
            ScenarioId::FrameJitter => self.run_frame_jitter(),
        };

        let result = match checked {
            Ok(mut report) => {
                let failure = report.1.err();
                let result = ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: failure.is_none(),
                    final_time_secs: report.0.ctx.now().as_secs_f64(),
                    failure_reason: failure,
                    metrics: report.0.metrics(),
                };
                report.0.scene.drain_into(&mut export);
                export.events = report.0.observer.events.clone();
                result
            }
            Err(reason) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: false,
                final_time_secs: 0.0,
                failure_reason: Some(reason),
                metrics: ScenarioMetrics::default(),
            },
        };
        export.finalize(result.passed, result.failure_reason.clone());

        if !result.passed {
            warn!(
                "{} failed: {}",
                scenario.name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
        (result, export)
    }

    fn default_route(&self) -> Vec<RouteStep> {
        self.route.clone().unwrap_or_else(|| {
            vec![
                RouteStep::new("China", Role::Exporter).with_material("Lithium", "2836.91"),
                RouteStep::new("USA", Role::Importer).with_material("Lithium", "2836.91"),
                RouteStep::new("Brazil", Role::Importer).with_material("Lithium", "2836.91"),
            ]
        })
    }

    fn resolver(&self) -> Box<dyn LocationResolver> {
        match &self.centroids {
            Some(centroids) => Box::new(centroids.clone()),
            None => Box::new(StaticGazetteer::builtin()),
        }
    }

    fn context(&self) -> Result<Arc<SimContext>, String> {
        SimContext::new(self.seed)
            .with_frame_rate(self.config.frame_rate_hz)
            .map(Arc::new)
            .map_err(|e| e.to_string())
    }

    /// Prepares and runs a route. If `cancel_at` is set, a watcher joined
    /// with the run cancels the session at that virtual time.
    fn execute(
        &self,
        ctx: Arc<SimContext>,
        steps: Vec<RouteStep>,
        resolver: &mut dyn LocationResolver,
        cancel_at: Option<Duration>,
    ) -> Result<RunReport, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| format!("runtime: {}", e))?;

        let scene = CaptureScene::new(Arc::clone(&ctx), EXPORT_EVERY);
        let mut controller = SequenceController::new(
            Arc::clone(&ctx),
            scene,
            RecordingObserver::new(),
            self.config.clone(),
        );
        controller
            .prepare(steps, resolver)
            .map_err(|e| format!("prepare: {}", e))?;
        for issue in controller.data_quality_issues() {
            warn!("  data quality: {}", issue);
        }

        let handle = controller.handle();
        let done = AtomicBool::new(false);
        let outcome = runtime.block_on(async {
            let run = async {
                let outcome = controller.run().await;
                done.store(true, Ordering::Release);
                outcome
            };
            let watch = async {
                let Some(at) = cancel_at else { return };
                while !done.load(Ordering::Acquire) {
                    if ctx.now() >= at {
                        debug!("  cancelling at t={:.3}s", ctx.now().as_secs_f64());
                        handle.cancel();
                        return;
                    }
                    tokio::task::yield_now().await;
                }
            };
            let (outcome, ()) = tokio::join!(run, watch);
            outcome
        });

        let phase = controller.phase();
        let visible = controller.renderer().visible();
        let pending = controller.pending();
        let (scene, observer) = controller.into_parts();
        Ok(RunReport {
            outcome,
            phase,
            visible,
            pending,
            scene,
            observer,
            ctx,
        })
    }

    /// Checks shared by every run that should finish normally.
    fn check_completed(report: &RunReport, legs: usize) -> Result<(), String> {
        match &report.outcome {
            Ok(RunOutcome::Completed) => {}
            other => return Err(format!("expected completion, got {:?}", other)),
        }
        if report.phase != SequencePhase::Done {
            return Err(format!("ended in {}", report.phase));
        }
        let steps = report.observer.step_indices();
        let expected: Vec<usize> = (0..=legs).collect();
        if steps != expected {
            return Err(format!("step notifications {:?}, expected {:?}", steps, expected));
        }
        let trails = report.scene.inner.trails.len();
        if trails != legs {
            return Err(format!("{} trails baked, expected {}", trails, legs));
        }
        if report.scene.inner.max_tip_drift > MAX_TIP_DRIFT {
            return Err(format!(
                "camera drifted {:.2e} rad from the arc tip",
                report.scene.inner.max_tip_drift
            ));
        }
        if report.scene.non_finite > 0 {
            return Err(format!("{} non-finite poses", report.scene.non_finite));
        }
        if !report.scene.inner.free_roam {
            return Err("free roam not re-enabled".to_string());
        }
        Ok(())
    }

    /// Checks shared by every run that should be torn down.
    fn check_cancelled(report: &RunReport, steps: &[usize], trails: usize) -> Result<(), String> {
        match &report.outcome {
            Ok(RunOutcome::Cancelled) => {}
            other => return Err(format!("expected cancellation, got {:?}", other)),
        }
        if report.phase != SequencePhase::Cancelled {
            return Err(format!("ended in {}", report.phase));
        }
        if report.observer.step_indices() != steps {
            return Err(format!(
                "step notifications {:?}, expected {:?}",
                report.observer.step_indices(),
                steps
            ));
        }
        if report.scene.inner.trails.len() != trails {
            return Err(format!("{} trails baked, expected {}", report.scene.inner.trails.len(), trails));
        }
        if report.visible != 0 || report.scene.inner.visible != 0 || report.scene.inner.arc_shown {
            return Err("live arc left on screen after teardown".to_string());
        }
        if report.pending != 0 {
            return Err(format!("{} waits still parked", report.pending));
        }
        if report.observer.phases().last() != Some(&SequencePhase::Cancelled) {
            return Err("notifications continued after teardown".to_string());
        }
        Ok(())
    }

    /// Virtual time at which the first arc has covered `fraction` of its
    /// duration, counted from the end of the fly-in and initial dwell.
    fn first_arc_time(&self, fraction: f64) -> Duration {
        let frame = Duration::from_secs(1) / self.config.frame_rate_hz.max(1);
        // one frame before the fly-in starts, one after it ends, one before
        // the arc starts
        self.config.fly_in()
            + self.config.initial_dwell()
            + frame * 3
            + self.config.arc_duration().mul_f64(fraction)
    }

    /// SEQ-001: FullRoute - the canonical three-stop run.
    fn run_full_route(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-001: FullRoute");
        let steps = self.default_route();
        let legs = steps.len().saturating_sub(1);
        let report = self.execute(self.context()?, steps, self.resolver().as_mut(), None)?;

        let mut verdict = Self::check_completed(&report, legs);
        if verdict.is_ok() {
            let phases = report.observer.phases();
            let expected = [
                SequencePhase::Loading,
                SequencePhase::Ready,
                SequencePhase::Running,
                SequencePhase::Done,
            ];
            if phases != expected {
                verdict = Err(format!("phases {:?}", phases));
            }
        }
        info!(
            "✓ FullRoute complete: {} frames, {} trails",
            report.ctx.frame_count(),
            report.scene.inner.trails.len()
        );
        Ok((report, verdict))
    }

    /// SEQ-002: SingleStop - must fail before any frame is requested.
    fn run_single_stop(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-002: SingleStop");
        let ctx = self.context()?;
        let mut controller = SequenceController::new(
            Arc::clone(&ctx),
            CaptureScene::new(Arc::clone(&ctx), EXPORT_EVERY),
            RecordingObserver::new(),
            self.config.clone(),
        );
        let steps = vec![RouteStep::new("China", Role::Exporter)];
        let prepared = controller.prepare(steps, self.resolver().as_mut());

        let verdict = match prepared {
            Err(SequenceError::Config(ConfigError::RouteTooShort { len: 1 })) => {
                if controller.phase() != SequencePhase::Loading {
                    Err(format!("moved to {}", controller.phase()))
                } else if ctx.frame_count() != 0 || controller.scene().inner.camera_updates != 0 {
                    Err("frames were requested".to_string())
                } else {
                    Ok(())
                }
            }
            other => Err(format!("expected RouteTooShort, got {:?}", other)),
        };

        let phase = controller.phase();
        let (scene, observer) = controller.into_parts();
        let report = RunReport {
            outcome: Err(SequenceError::NotReady { phase }),
            phase,
            visible: 0,
            pending: 0,
            scene,
            observer,
            ctx,
        };
        Ok((report, verdict))
    }

    /// SEQ-003: CancelMidArc - teardown at ~40% of the first arc.
    fn run_cancel_mid_arc(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-003: CancelMidArc");
        let at = self.first_arc_time(0.4);
        let report = self.execute(self.context()?, self.default_route(), self.resolver().as_mut(), Some(at))?;

        let mut verdict = Self::check_cancelled(&report, &[0], 0);
        // resolved within one frame of the cancel
        let overshoot = report.ctx.now().saturating_sub(at);
        if verdict.is_ok() && overshoot > report.ctx.frame_interval() {
            verdict = Err(format!("run resolved {}ms after cancel", overshoot.as_millis()));
        }
        Ok((report, verdict))
    }

    /// SEQ-004: CancelDuringFlyIn - nothing announced yet.
    fn run_cancel_during_fly_in(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-004: CancelDuringFlyIn");
        let at = self.config.fly_in() / 2;
        let report = self.execute(self.context()?, self.default_route(), self.resolver().as_mut(), Some(at))?;

        let mut verdict = Self::check_cancelled(&report, &[], 0);
        if verdict.is_ok() && !report.observer.highlights().is_empty() {
            verdict = Err("stop highlighted before the fly-in finished".to_string());
        }
        Ok((report, verdict))
    }

    /// SEQ-005: CancelDuringDwell - after the first arrival.
    fn run_cancel_during_dwell(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-005: CancelDuringDwell");
        let at = self.first_arc_time(1.0) + self.config.settle() + self.config.dwell() / 2;
        let report = self.execute(self.context()?, self.default_route(), self.resolver().as_mut(), Some(at))?;

        let verdict = Self::check_cancelled(&report, &[0, 1], 1);
        Ok((report, verdict))
    }

    /// SEQ-006: PolarRoute - stops on and across the poles.
    fn run_polar_route(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-006: PolarRoute");
        let mut gazetteer = StaticGazetteer::new();
        gazetteer.insert("Tromso", GeoPoint::new(69.6, 18.9));
        gazetteer.insert("North Pole", GeoPoint::new(90.0, 0.0));
        gazetteer.insert("McMurdo", GeoPoint::new(-77.8, 166.7));
        let steps = vec![
            RouteStep::new("Tromso", Role::Exporter),
            RouteStep::new("North Pole", Role::Importer),
            RouteStep::new("McMurdo", Role::Importer),
        ];
        let report = self.execute(self.context()?, steps, &mut gazetteer, None)?;

        let verdict = Self::check_completed(&report, 2);
        Ok((report, verdict))
    }

    /// SEQ-007: AntipodalRoute - slerp has no unique great circle here.
    fn run_antipodal_route(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-007: AntipodalRoute");
        let mut gazetteer = StaticGazetteer::new();
        gazetteer.insert("Quito", GeoPoint::new(0.0, -78.0));
        gazetteer.insert("Antipode", GeoPoint::new(0.0, 102.0));
        let steps = vec![
            RouteStep::new("Quito", Role::Exporter),
            RouteStep::new("Antipode", Role::Importer),
        ];
        let report = self.execute(self.context()?, steps, &mut gazetteer, None)?;

        let mut verdict = Self::check_completed(&report, 1);
        if verdict.is_ok() {
            let ceiling = GLOBE_RADIUS * (1.0 + self.config.arc_peak) + 1e-3;
            let off_sphere = report.scene.inner.trails.iter().flat_map(|t| &t.points).any(|p| {
                let r = p.coords.cast::<f64>().norm();
                !r.is_finite() || r < GLOBE_RADIUS - 1e-3 || r > ceiling
            });
            if off_sphere {
                verdict = Err("antipodal arc left the globe shell".to_string());
            }
        }
        Ok((report, verdict))
    }

    /// SEQ-008: FrameJitter - uneven frame spacing.
    fn run_frame_jitter(&self) -> Result<(RunReport, Result<(), String>), String> {
        info!("SEQ-008: FrameJitter");
        let ctx = SimContext::new(self.seed)
            .with_frame_rate(self.config.frame_rate_hz)
            .and_then(|ctx| ctx.with_jitter(0.15))
            .map_err(|e| e.to_string())?;
        let steps = self.default_route();
        let legs = steps.len().saturating_sub(1);
        let report = self.execute(Arc::new(ctx), steps, self.resolver().as_mut(), None)?;

        let verdict = Self::check_completed(&report, legs);
        Ok((report, verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_arc_time_lands_inside_first_arc() {
        let runner = ScenarioRunner::new(1);
        let start = runner.first_arc_time(0.0);
        assert!(start > Duration::from_millis(3000));
        assert!(runner.first_arc_time(0.4) < start + Duration::from_millis(1100));
    }

    #[test]
    fn test_full_route_passes() {
        let result = ScenarioRunner::new(42).run(ScenarioId::FullRoute);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.trails, 2);
        assert_eq!(result.metrics.step_events, 3);
    }

    #[test]
    fn test_frame_rate_comes_from_config() {
        let at_60 = ScenarioRunner::new(42).run(ScenarioId::FullRoute);
        let at_30 = ScenarioRunner::new(42)
            .with_config(ChoreographyConfig {
                frame_rate_hz: 30,
                ..Default::default()
            })
            .run(ScenarioId::FullRoute);

        assert!(at_30.passed, "{:?}", at_30.failure_reason);
        assert!(at_30.metrics.frames < at_60.metrics.frames);
    }

    #[test]
    fn test_bad_frame_rate_fails_the_run() {
        let result = ScenarioRunner::new(42)
            .with_config(ChoreographyConfig {
                frame_rate_hz: 5000,
                ..Default::default()
            })
            .run(ScenarioId::FullRoute);
        assert!(!result.passed);
    }
}
