//! Measurement session state and interaction modes
//!
//! One `Session` holds everything a measurement run needs: the loaded
//! image, grid corners, derived or manual LED positions, zoom state,
//! undo/redo history, and the last measurement results. All mutation goes
//! through session operations, so concurrent sessions never share state;
//! a host embedding this in multiple threads serializes access per session.
//!
//! Interactive multi-step flows (corner definition, corner editing, manual
//! positioning, pixel adjustment) are modal. `SessionMode` replaces the
//! boolean flag per flow with explicit, mutually exclusive states; every
//! modal flow has a cancel operation that discards uncommitted input
//! without touching committed positions or measurements.

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::align::{self, AlignmentOutcome};
use crate::config::Config;
use crate::enhance::{enhance_dark_regions, EnhanceParams};
use crate::geometry::{
    compute_grid_positions, Corner, CornerSet, GridError, GridSpec, LedPosition,
};
use crate::history::{HistoryManager, Snapshot, DEFAULT_MAX_HISTORY};
use crate::interpolate::complete_measurements;
use crate::manual::{ManualClick, ManualPositionStore};
use crate::sample::{sample_positions, MeasurementSet};
use crate::transform::{ViewTransform, ZoomState};

/// Click distance threshold for grabbing a corner, display px
const CORNER_PICK_THRESHOLD: f64 = 20.0;
/// Click distance threshold for selecting an LED, display px
const LED_PICK_THRESHOLD: f64 = 15.0;

/// Session errors; all locally recoverable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no image loaded")]
    NoImageLoaded,
    #[error("grid corners are not defined")]
    CornersNotDefined,
    #[error("no LED positions defined; define grid corners or position LEDs manually")]
    PositionsNotDefined,
    #[error("another interactive flow is active: {0:?}")]
    ModeConflict(SessionMode),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Which interactive flow is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    DefiningCorners,
    EditingCorners,
    ManualPositioning,
    AdjustingPixels,
}

/// Which pipeline populated the active position list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    GridDerived,
    Manual,
    AutoAligned,
}

/// How brightness values are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementMethod {
    Direct,
    Interpolation,
    Manual,
}

impl MeasurementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementMethod::Direct => "direct",
            MeasurementMethod::Interpolation => "interpolation",
            MeasurementMethod::Manual => "manual",
        }
    }
}

/// What a click did, given the active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Corner recorded during definition; 4th corner commits the set
    CornerPlaced { index: usize },
    /// All four corners placed and the grid recomputed
    CornersCommitted,
    /// An existing corner was moved and the grid recomputed
    CornerMoved { index: usize },
    /// No corner within picking range
    CornerMissed,
    /// Manual position recorded
    ManualPlaced {
        row: u32,
        col: u32,
        placed: usize,
        expected: usize,
    },
    /// Manual store already full; click ignored
    ManualComplete,
    /// LED selected for adjustment; the next click moves it
    LedSelected { row: u32, col: u32 },
    /// Selected LED moved to the clicked position
    LedMoved { row: u32, col: u32 },
    /// No LED within picking range
    LedMissed,
    /// Click in Idle mode; nothing to do
    Ignored,
}

/// Result summary of a measurement pass
#[derive(Debug, Clone)]
pub struct MeasurementReport {
    pub measurements: MeasurementSet,
    pub method: MeasurementMethod,
    pub measured: usize,
    pub interpolated: usize,
}

impl MeasurementReport {
    /// A direct pass that skipped positions leaves the set partial
    pub fn is_complete(&self, n: u32) -> bool {
        self.measurements.len() == (n as usize) * (n as usize)
    }
}

/// All state for one measurement session
pub struct Session {
    canvas_w: u32,
    canvas_h: u32,
    grid: GridSpec,
    sampling_radius: u32,
    dark_threshold: f64,
    dark_factor: f64,
    enhance_dark_leds: bool,
    enhance_params: EnhanceParams,

    image: Option<RgbImage>,
    view: ViewTransform,
    zoom: ZoomState,

    corners: Option<CornerSet>,
    pending_corners: Vec<Corner>,
    positions: Vec<LedPosition>,
    source: Option<PositionSource>,
    manual: ManualPositionStore,
    selected_led: Option<usize>,

    mode: SessionMode,
    history: HistoryManager,
    results: Option<MeasurementReport>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, GridError> {
        let grid = GridSpec::new(config.grid.array_size)?;
        Ok(Self {
            canvas_w: config.canvas.width,
            canvas_h: config.canvas.height,
            grid,
            sampling_radius: config.clamped_sampling_radius(),
            dark_threshold: config.measure.dark_threshold,
            dark_factor: config.measure.dark_factor,
            enhance_dark_leds: config.measure.enhance_dark_leds,
            enhance_params: config.measure.enhancement,
            image: None,
            view: ViewTransform::identity(),
            zoom: ZoomState::new(
                config.zoom.min_zoom,
                config.zoom.max_zoom,
                config.zoom.step,
            ),
            corners: None,
            pending_corners: Vec::new(),
            positions: Vec::new(),
            source: None,
            manual: ManualPositionStore::new(grid.size()),
            selected_led: None,
            mode: SessionMode::Idle,
            history: HistoryManager::new(DEFAULT_MAX_HISTORY),
            results: None,
        })
    }

    // Accessors

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn array_size(&self) -> u32 {
        self.grid.size()
    }

    pub fn corners(&self) -> Option<&CornerSet> {
        self.corners.as_ref()
    }

    pub fn positions(&self) -> &[LedPosition] {
        &self.positions
    }

    pub fn position_source(&self) -> Option<PositionSource> {
        self.source
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom.level()
    }

    pub fn results(&self) -> Option<&MeasurementReport> {
        self.results.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    pub fn manual_progress(&self) -> (usize, usize) {
        (self.manual.len(), self.manual.expected())
    }

    // Image and grid setup

    /// Load a decoded image. Resets the fit scale, the zoom, and all
    /// detection state from any previous image.
    pub fn load_image(&mut self, image: RgbImage) {
        let (w, h) = image.dimensions();
        self.zoom.reset();
        self.view = ViewTransform::fit_to_canvas(w, h, self.canvas_w, self.canvas_h);
        self.image = Some(image);
        self.clear_all_detections();
        info!(
            "image loaded: {}x{}, display scale {:.3}",
            w,
            h,
            self.view.scale_factor()
        );
    }

    /// Change the array size. Recomputes grid positions when corners exist;
    /// any partial manual store is discarded since its cells no longer
    /// correspond.
    pub fn set_array_size(&mut self, n: u32) -> Result<(), GridError> {
        self.grid = GridSpec::new(n)?;
        self.manual.clear(n);
        if let Some(corners) = self.corners {
            self.positions = compute_grid_positions(&corners, n);
            self.source = Some(PositionSource::GridDerived);
        }
        Ok(())
    }

    // Snapshots

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            corners: self.corners,
            positions: self.positions.clone(),
            manual: self.manual.clone(),
            array_size: self.grid.size(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.corners = snapshot.corners;
        self.positions = snapshot.positions;
        self.manual = snapshot.manual;
        if let Ok(grid) = GridSpec::new(snapshot.array_size) {
            self.grid = grid;
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.mode == SessionMode::Idle {
            Ok(())
        } else {
            Err(SessionError::ModeConflict(self.mode))
        }
    }

    // Corner definition

    /// Begin collecting the four grid corners. Snapshots the current state
    /// so the whole definition is one undo step.
    pub fn begin_corner_definition(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.history.save_state(self.snapshot());
        self.pending_corners.clear();
        self.mode = SessionMode::DefiningCorners;
        Ok(())
    }

    /// Abort corner definition, discarding partial clicks. Committed
    /// corners and positions are untouched.
    pub fn cancel_corner_definition(&mut self) {
        self.pending_corners.clear();
        if self.mode == SessionMode::DefiningCorners {
            self.mode = SessionMode::Idle;
        }
    }

    // Corner editing

    pub fn begin_corner_editing(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.corners.is_none() {
            return Err(SessionError::CornersNotDefined);
        }
        self.mode = SessionMode::EditingCorners;
        Ok(())
    }

    pub fn finish_corner_editing(&mut self) {
        if self.mode == SessionMode::EditingCorners {
            self.mode = SessionMode::Idle;
        }
    }

    // Manual positioning

    /// Begin click-by-click positioning. Snapshots the current state so the
    /// whole flow, including a later promotion, is one undo step.
    pub fn begin_manual_positioning(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.history.save_state(self.snapshot());
        self.manual.clear(self.grid.size());
        self.mode = SessionMode::ManualPositioning;
        Ok(())
    }

    /// Finish the flow. A complete store is promoted to the active
    /// position list; a partial one is left as-is and reported incomplete.
    pub fn finish_manual_positioning(&mut self) -> bool {
        self.mode = SessionMode::Idle;
        match self.manual.to_positions() {
            Some(positions) => {
                self.positions = positions;
                self.source = Some(PositionSource::Manual);
                info!(
                    "manual positioning complete: {} LEDs positioned",
                    self.positions.len()
                );
                true
            }
            None => {
                let (placed, expected) = self.manual_progress();
                info!(
                    "manual positioning incomplete: {}/{} LEDs",
                    placed, expected
                );
                false
            }
        }
    }

    /// Cancel the flow and discard all recorded clicks.
    pub fn cancel_manual_positioning(&mut self) {
        self.manual.clear(self.grid.size());
        if self.mode == SessionMode::ManualPositioning {
            self.mode = SessionMode::Idle;
        }
    }

    // Pixel adjustment

    pub fn begin_pixel_adjustment(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if self.positions.is_empty() {
            return Err(SessionError::PositionsNotDefined);
        }
        self.selected_led = None;
        self.mode = SessionMode::AdjustingPixels;
        Ok(())
    }

    /// Exit adjustment mode, dropping any pending selection.
    pub fn exit_pixel_adjustment(&mut self) {
        self.selected_led = None;
        if self.mode == SessionMode::AdjustingPixels {
            self.mode = SessionMode::Idle;
        }
    }

    // Click dispatch

    /// Handle a click at display coordinates, dispatched on the active mode.
    pub fn handle_click(&mut self, x: f64, y: f64) -> ClickOutcome {
        match self.mode {
            SessionMode::DefiningCorners => self.click_defining(x, y),
            SessionMode::EditingCorners => self.click_editing(x, y),
            SessionMode::ManualPositioning => self.click_manual(x, y),
            SessionMode::AdjustingPixels => self.click_adjusting(x, y),
            SessionMode::Idle => ClickOutcome::Ignored,
        }
    }

    fn click_defining(&mut self, x: f64, y: f64) -> ClickOutcome {
        self.pending_corners.push(Corner::new(x, y));
        let index = self.pending_corners.len() - 1;
        if self.pending_corners.len() < 4 {
            return ClickOutcome::CornerPlaced { index };
        }

        // Fourth corner: commit the set and derive the grid.
        // from_points cannot fail here; the click sequence is length 4.
        if let Ok(corners) = CornerSet::from_points(&self.pending_corners) {
            self.corners = Some(corners);
            self.positions = compute_grid_positions(&corners, self.grid.size());
            self.source = Some(PositionSource::GridDerived);
        }
        self.pending_corners.clear();
        self.mode = SessionMode::Idle;
        debug!("grid corners committed, {} positions", self.positions.len());
        ClickOutcome::CornersCommitted
    }

    fn click_editing(&mut self, x: f64, y: f64) -> ClickOutcome {
        let Some(mut corners) = self.corners else {
            return ClickOutcome::CornerMissed;
        };
        let Some(index) = corners.find_nearest(x, y, CORNER_PICK_THRESHOLD) else {
            return ClickOutcome::CornerMissed;
        };
        self.history.save_state(self.snapshot());
        corners.corners[index] = Corner::new(x, y);
        self.corners = Some(corners);
        self.positions = compute_grid_positions(&corners, self.grid.size());
        self.source = Some(PositionSource::GridDerived);
        ClickOutcome::CornerMoved { index }
    }

    fn click_manual(&mut self, x: f64, y: f64) -> ClickOutcome {
        match self.manual.record_click(x as i32, y as i32) {
            ManualClick::Placed {
                row,
                col,
                placed,
                expected,
            } => ClickOutcome::ManualPlaced {
                row,
                col,
                placed,
                expected,
            },
            ManualClick::Complete => ClickOutcome::ManualComplete,
        }
    }

    fn click_adjusting(&mut self, x: f64, y: f64) -> ClickOutcome {
        match self.selected_led {
            None => match self.find_nearest_led(x, y) {
                Some(index) => {
                    self.selected_led = Some(index);
                    let pos = self.positions[index];
                    ClickOutcome::LedSelected {
                        row: pos.row,
                        col: pos.col,
                    }
                }
                None => ClickOutcome::LedMissed,
            },
            Some(index) => {
                self.history.save_state(self.snapshot());
                let pos = self.positions[index];
                self.positions[index] = LedPosition::new(x as i32, y as i32, pos.row, pos.col);
                self.selected_led = None;
                ClickOutcome::LedMoved {
                    row: pos.row,
                    col: pos.col,
                }
            }
        }
    }

    fn find_nearest_led(&self, x: f64, y: f64) -> Option<usize> {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;
        for (i, pos) in self.positions.iter().enumerate() {
            let distance = pos.distance_to(x, y);
            if distance < LED_PICK_THRESHOLD && distance < min_distance {
                min_distance = distance;
                nearest = Some(i);
            }
        }
        nearest
    }

    // Detection

    /// Clear corners, positions, and manual clicks in one undoable step.
    pub fn clear_all_detections(&mut self) {
        self.history.save_state(self.snapshot());
        self.corners = None;
        self.pending_corners.clear();
        self.positions.clear();
        self.source = None;
        self.manual.clear(self.grid.size());
        self.selected_led = None;
        self.mode = SessionMode::Idle;
        debug!("all detections cleared");
    }

    /// Run heuristic candidate detection and naive grid assignment.
    /// A shortfall leaves a partial position list and is reported in the
    /// outcome, not treated as a failure.
    pub fn auto_align(&mut self) -> Result<AlignmentOutcome, SessionError> {
        self.ensure_idle()?;
        let image = self.image.as_ref().ok_or(SessionError::NoImageLoaded)?;
        let outcome = align::auto_align(image, self.grid.size(), &self.view);
        if !outcome.positions.is_empty() {
            self.positions = outcome.positions.clone();
            self.source = Some(PositionSource::AutoAligned);
        }
        Ok(outcome)
    }

    // Zoom

    pub fn zoom_in(&mut self) -> f64 {
        if self.zoom.zoom_in() {
            self.apply_zoom();
        }
        self.zoom.level()
    }

    pub fn zoom_out(&mut self) -> f64 {
        if self.zoom.zoom_out() {
            self.apply_zoom();
        }
        self.zoom.level()
    }

    pub fn reset_zoom(&mut self) -> f64 {
        self.zoom.reset();
        self.apply_zoom();
        self.zoom.level()
    }

    fn apply_zoom(&mut self) {
        if let Some(image) = &self.image {
            let (w, h) = image.dimensions();
            self.view =
                ViewTransform::with_zoom(w, h, self.canvas_w, self.canvas_h, self.zoom.level());
        }
    }

    // Measurement

    /// Sample brightness at the active positions.
    ///
    /// Manual method measures the manual store's positions (partial stores
    /// measure what they have); it falls back to the active list when no
    /// manual clicks exist. Interpolation method completes the direct set
    /// over the full grid afterwards.
    pub fn measure(&mut self, method: MeasurementMethod) -> Result<&MeasurementReport, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImageLoaded)?;

        let positions = match method {
            MeasurementMethod::Manual if !self.manual.is_empty() => {
                self.manual.positions_so_far()
            }
            _ => {
                if self.positions.is_empty() {
                    return Err(SessionError::PositionsNotDefined);
                }
                self.positions.clone()
            }
        };

        // Enhancement runs on a working copy; the stored image is untouched
        let measurements = if self.enhance_dark_leds {
            let work = enhance_dark_regions(image, &self.enhance_params);
            sample_positions(&work, &positions, self.sampling_radius, &self.view)
        } else {
            sample_positions(image, &positions, self.sampling_radius, &self.view)
        };

        let measurements = if method == MeasurementMethod::Interpolation {
            complete_measurements(
                &measurements,
                self.grid.size(),
                self.dark_threshold,
                self.dark_factor,
            )
        } else {
            measurements
        };

        let interpolated = measurements.values().filter(|m| m.interpolated).count();
        let report = MeasurementReport {
            measured: measurements.len(),
            interpolated,
            measurements,
            method,
        };
        info!(
            "measured {} LEDs using {} ({} interpolated)",
            report.measured,
            method.as_str(),
            report.interpolated
        );
        Ok(self.results.insert(report))
    }

    // History

    /// Undo the last snapshot. Returns false (nothing to undo) on an empty
    /// history; the current state is unchanged in that case.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.snapshot()) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => {
                debug!("nothing to undo");
                false
            }
        }
    }

    /// Symmetric to `undo`.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.snapshot()) {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => {
                debug!("nothing to redo");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_session(n: u32) -> Session {
        let mut config = Config::default();
        config.grid.array_size = n;
        config.measure.enhance_dark_leds = false;
        // Canvas matches the test image so the fit scale stays 1:1
        config.canvas.width = 100;
        config.canvas.height = 100;
        let mut session = Session::new(&config).unwrap();
        session.load_image(RgbImage::from_pixel(100, 100, Rgb([80, 80, 80])));
        session
    }

    fn define_unit_corners(session: &mut Session) {
        session.begin_corner_definition().unwrap();
        session.handle_click(0.0, 0.0);
        session.handle_click(90.0, 0.0);
        session.handle_click(90.0, 90.0);
        let outcome = session.handle_click(0.0, 90.0);
        assert_eq!(outcome, ClickOutcome::CornersCommitted);
    }

    #[test]
    fn test_corner_definition_flow() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        assert_eq!(session.mode(), SessionMode::Idle);
        assert_eq!(session.positions().len(), 9);
        assert_eq!(session.position_source(), Some(PositionSource::GridDerived));
    }

    #[test]
    fn test_mode_exclusion() {
        let mut session = test_session(3);
        session.begin_corner_definition().unwrap();
        assert_eq!(
            session.begin_manual_positioning(),
            Err(SessionError::ModeConflict(SessionMode::DefiningCorners))
        );
        session.cancel_corner_definition();
        assert!(session.begin_manual_positioning().is_ok());
    }

    #[test]
    fn test_cancel_definition_preserves_committed_state() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        let committed = session.positions().to_vec();

        session.begin_corner_definition().unwrap();
        session.handle_click(5.0, 5.0);
        session.handle_click(6.0, 6.0);
        session.cancel_corner_definition();

        assert_eq!(session.positions(), committed.as_slice());
        assert!(session.corners().is_some());
    }

    #[test]
    fn test_corner_editing_moves_and_recomputes() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        let before = session.positions()[4];

        session.begin_corner_editing().unwrap();
        // Click near the bottom-right corner and drag it outward
        let outcome = session.handle_click(95.0, 95.0);
        assert_eq!(outcome, ClickOutcome::CornerMoved { index: 2 });
        session.finish_corner_editing();

        assert_ne!(session.positions()[4], before);
        // A click far from every corner is a miss
        session.begin_corner_editing().unwrap();
        assert_eq!(session.handle_click(45.0, 45.0), ClickOutcome::CornerMissed);
    }

    #[test]
    fn test_editing_requires_corners() {
        let mut session = test_session(3);
        assert_eq!(
            session.begin_corner_editing(),
            Err(SessionError::CornersNotDefined)
        );
    }

    #[test]
    fn test_manual_positioning_promotion() {
        let mut session = test_session(2);
        session.begin_manual_positioning().unwrap();
        for (x, y) in [(10.0, 10.0), (30.0, 10.0), (10.0, 30.0), (30.0, 30.0)] {
            session.handle_click(x, y);
        }
        assert!(session.finish_manual_positioning());
        assert_eq!(session.positions().len(), 4);
        assert_eq!(session.position_source(), Some(PositionSource::Manual));
        assert_eq!(session.positions()[3], LedPosition::new(30, 30, 1, 1));
    }

    #[test]
    fn test_partial_manual_store_not_promoted() {
        let mut session = test_session(2);
        define_unit_corners_2x2(&mut session);
        let committed = session.positions().to_vec();

        session.begin_manual_positioning().unwrap();
        session.handle_click(10.0, 10.0);
        assert!(!session.finish_manual_positioning());
        // Active positions unchanged by the incomplete flow
        assert_eq!(session.positions(), committed.as_slice());
        assert_eq!(session.position_source(), Some(PositionSource::GridDerived));
    }

    fn define_unit_corners_2x2(session: &mut Session) {
        session.begin_corner_definition().unwrap();
        session.handle_click(0.0, 0.0);
        session.handle_click(90.0, 0.0);
        session.handle_click(90.0, 90.0);
        session.handle_click(0.0, 90.0);
    }

    #[test]
    fn test_cancel_manual_discards_clicks() {
        let mut session = test_session(2);
        session.begin_manual_positioning().unwrap();
        session.handle_click(10.0, 10.0);
        session.cancel_manual_positioning();
        assert_eq!(session.manual_progress(), (0, 4));
        assert_eq!(session.mode(), SessionMode::Idle);
    }

    #[test]
    fn test_pixel_adjustment_select_then_move() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);

        session.begin_pixel_adjustment().unwrap();
        // Center LED is at (45, 45)
        let outcome = session.handle_click(47.0, 44.0);
        assert_eq!(outcome, ClickOutcome::LedSelected { row: 1, col: 1 });
        let outcome = session.handle_click(60.0, 62.0);
        assert_eq!(outcome, ClickOutcome::LedMoved { row: 1, col: 1 });
        session.exit_pixel_adjustment();

        let moved = session
            .positions()
            .iter()
            .find(|p| p.row == 1 && p.col == 1)
            .unwrap();
        assert_eq!((moved.x, moved.y), (60, 62));
    }

    #[test]
    fn test_pixel_adjustment_requires_positions() {
        let mut session = test_session(3);
        assert_eq!(
            session.begin_pixel_adjustment(),
            Err(SessionError::PositionsNotDefined)
        );
    }

    #[test]
    fn test_measure_requires_image() {
        let config = Config::default();
        let mut session = Session::new(&config).unwrap();
        assert_eq!(
            session.measure(MeasurementMethod::Direct).err(),
            Some(SessionError::NoImageLoaded)
        );
    }

    #[test]
    fn test_measure_requires_positions() {
        let mut session = test_session(3);
        assert_eq!(
            session.measure(MeasurementMethod::Direct).err(),
            Some(SessionError::PositionsNotDefined)
        );
    }

    #[test]
    fn test_direct_measurement_on_uniform_image() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        let report = session.measure(MeasurementMethod::Direct).unwrap();
        assert_eq!(report.measured, 9);
        assert_eq!(report.interpolated, 0);
        assert!(report.is_complete(3));
        let m = report.measurements.get(&(1, 1)).unwrap();
        assert_eq!(m.r, 80.0);
    }

    #[test]
    fn test_interpolation_method_totalizes() {
        let mut session = test_session(3);
        // Corners pushed so some positions fall outside the image: their
        // regions clip to empty and the direct set is partial.
        session.begin_corner_definition().unwrap();
        session.handle_click(0.0, 0.0);
        session.handle_click(300.0, 0.0);
        session.handle_click(300.0, 300.0);
        session.handle_click(0.0, 300.0);

        let report = session.measure(MeasurementMethod::Interpolation).unwrap();
        assert_eq!(report.measured, 9);
        assert!(report.interpolated > 0);
        assert!(report.is_complete(3));
    }

    #[test]
    fn test_manual_measurement_samples_store() {
        let mut config = Config::default();
        config.grid.array_size = 2;
        config.measure.enhance_dark_leds = false;
        config.canvas.width = 100;
        config.canvas.height = 100;
        let mut session = Session::new(&config).unwrap();

        // Left half dim, right half bright
        let mut image = RgbImage::from_pixel(100, 100, Rgb([10, 10, 10]));
        for y in 0..100 {
            for x in 50..100 {
                image.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        session.load_image(image);

        session.begin_manual_positioning().unwrap();
        session.handle_click(20.0, 50.0);
        session.handle_click(80.0, 50.0);
        assert!(!session.finish_manual_positioning());

        // A partial store still measures the clicks it holds, in cell order
        let report = session.measure(MeasurementMethod::Manual).unwrap();
        assert_eq!(report.method, MeasurementMethod::Manual);
        assert_eq!(report.measured, 2);
        assert_eq!(report.measurements.get(&(0, 0)).unwrap().r, 10.0);
        assert_eq!(report.measurements.get(&(0, 1)).unwrap().r, 200.0);
    }

    #[test]
    fn test_manual_measurement_falls_back_to_active_positions() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);

        // No manual clicks recorded: the active grid positions are used
        let report = session.measure(MeasurementMethod::Manual).unwrap();
        assert_eq!(report.measured, 9);
        assert_eq!(report.measurements.get(&(1, 1)).unwrap().r, 80.0);
    }

    #[test]
    fn test_undo_redo_restores_geometry() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        assert!(session.corners().is_some());

        session.clear_all_detections();
        assert!(session.corners().is_none());

        assert!(session.undo());
        assert!(session.corners().is_some());
        assert_eq!(session.positions().len(), 9);

        assert!(session.redo());
        assert!(session.corners().is_none());
    }

    #[test]
    fn test_undo_on_empty_history_is_signal() {
        let config = Config::default();
        let mut session = Session::new(&config).unwrap();
        assert!(!session.undo());
        assert!(!session.redo());
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        session.clear_all_detections();
        session.undo();
        assert!(session.redo_len() > 0);

        session.clear_all_detections();
        assert_eq!(session.redo_len(), 0);
    }

    #[test]
    fn test_set_array_size_recomputes() {
        let mut session = test_session(3);
        define_unit_corners(&mut session);
        session.set_array_size(5).unwrap();
        assert_eq!(session.positions().len(), 25);
        assert!(session.set_array_size(1).is_err());
    }

    #[test]
    fn test_zoom_changes_view_scale() {
        let mut session = test_session(3);
        let base = session.zoom_level();
        assert!((base - 1.0).abs() < 1e-9);
        let level = session.zoom_in();
        assert!((level - 1.1).abs() < 1e-9);
        session.reset_zoom();
        assert!((session.zoom_level() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_align_requires_image() {
        let config = Config::default();
        let mut session = Session::new(&config).unwrap();
        assert!(matches!(
            session.auto_align(),
            Err(SessionError::NoImageLoaded)
        ));
    }
}
