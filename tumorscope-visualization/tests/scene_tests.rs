//! SceneHost lifecycle tests
//!
//! A recording backend stands in for the GPU so the attach/release ordering,
//! the frame loop and teardown can be checked without a device.

use approx::assert_relative_eq;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tumorscope_core::*;
use tumorscope_gpu::SceneFrame;
use tumorscope_visualization::*;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Allocate(u32),
    Release(u32),
    Draw(Option<u32>),
    Resize(u32, u32),
    Detach,
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    live: usize,
    next_id: u32,
    fail_allocate: bool,
    last_frame: Option<SceneFrame>,
}

#[derive(Clone, Default)]
struct RecordingBackend {
    log: Rc<RefCell<Recorder>>,
}

impl RecordingBackend {
    fn calls(&self) -> Vec<Call> {
        self.log.borrow().calls.clone()
    }

    fn live(&self) -> usize {
        self.log.borrow().live
    }

    fn fail_next_allocations(&self, fail: bool) {
        self.log.borrow_mut().fail_allocate = fail;
    }

    fn draws(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Draw(_)))
            .count()
    }
}

impl RenderBackend for RecordingBackend {
    type Resources = u32;

    fn allocate(&mut self, _geometry: &BuiltGeometry) -> Result<u32> {
        let mut log = self.log.borrow_mut();
        if log.fail_allocate {
            return Err(Error::GpuResource("out of device memory".to_string()));
        }
        log.next_id += 1;
        let id = log.next_id;
        log.live += 1;
        log.calls.push(Call::Allocate(id));
        Ok(id)
    }

    fn release(&mut self, resources: u32) {
        let mut log = self.log.borrow_mut();
        log.live -= 1;
        log.calls.push(Call::Release(resources));
    }

    fn draw(&mut self, resources: Option<&u32>, frame: &SceneFrame) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Draw(resources.copied()));
        log.last_frame = Some(*frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.log.borrow_mut().calls.push(Call::Resize(width, height));
    }

    fn detach_surface(&mut self) {
        self.log.borrow_mut().calls.push(Call::Detach);
    }
}

fn host() -> (SceneHost<RecordingBackend>, RecordingBackend) {
    let backend = RecordingBackend::default();
    let host = SceneHost::new(backend.clone(), &ViewerConfig::default());
    (host, backend)
}

fn counting_requester() -> (Rc<Cell<u32>>, Rc<dyn FrameRequester>) {
    let requests = Rc::new(Cell::new(0));
    let counter = requests.clone();
    let requester: Rc<dyn FrameRequester> = Rc::new(move || counter.set(counter.get() + 1));
    (requests, requester)
}

fn triangle() -> Payload {
    Payload::from_json(&json!({
        "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        "faces": [[0, 1, 2]]
    }))
    .unwrap()
}

fn volume(bytes: Vec<u8>) -> Payload {
    VolumetricInput::from_bytes(bytes, Dimensions::new(2, 2, 2)).into()
}

#[test]
fn test_repeated_attach_keeps_one_allocation() {
    let (mut host, backend) = host();
    for _ in 0..5 {
        host.attach(triangle()).unwrap();
        assert_eq!(backend.live(), 1);
    }

    let calls = backend.calls();
    assert_eq!(calls[0], Call::Allocate(1));
    for id in 1..5 {
        let release = calls.iter().position(|c| *c == Call::Release(id)).unwrap();
        let next = calls
            .iter()
            .position(|c| *c == Call::Allocate(id + 1))
            .unwrap();
        assert!(release < next, "release {} must precede allocate {}", id, id + 1);
    }
}

#[test]
fn test_switching_between_surface_and_volume() {
    let (mut host, backend) = host();
    host.attach(triangle()).unwrap();
    let renderable = host.attach(volume((0..8).collect())).unwrap();
    assert_eq!(renderable.kind(), "volume");
    assert_relative_eq!(renderable.camera_distance(), 3.0 * 0.75_f32.sqrt(), epsilon = 1e-5);
    assert_eq!(backend.live(), 1);
}

#[test]
fn test_teardown_twice_is_clean() {
    let (mut host, backend) = host();
    let (_, requester) = counting_requester();
    host.start(requester).unwrap();
    host.attach(triangle()).unwrap();

    host.teardown();
    host.teardown();

    assert!(host.is_torn_down());
    assert!(!host.is_running());
    assert!(host.renderable().is_none());
    assert_eq!(backend.live(), 0);
    let detaches = backend
        .calls()
        .iter()
        .filter(|c| **c == Call::Detach)
        .count();
    assert_eq!(detaches, 1);
}

#[test]
fn test_drop_tears_down() {
    let (mut host, backend) = host();
    host.attach(triangle()).unwrap();
    drop(host);
    assert_eq!(backend.live(), 0);
    assert_eq!(backend.calls().last(), Some(&Call::Detach));
}

#[test]
fn test_malformed_volume_keeps_previous_scene() {
    let (mut host, backend) = host();
    host.attach(triangle()).unwrap();

    let err = host.attach(volume(vec![0; 7])).unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)));

    let renderable = host.renderable().unwrap();
    assert_eq!(renderable.kind(), "surface");
    assert_eq!(backend.live(), 1);
    assert!(!backend.calls().contains(&Call::Release(1)));
}

#[test]
fn test_render_with_malformed_volume_keeps_previous_scene() {
    let (mut host, backend) = host();
    let label = ClassificationLabel::new("glioma");
    let first = host.render(Some(triangle()), &Metrics::with_depth(1.0), &label);
    assert!(first.view.is_ready());

    let outcome = host.render(Some(volume(vec![0; 7])), &Metrics::with_depth(12.345), &label);

    assert!(matches!(outcome.view, ViewStatus::Malformed(_)));
    assert_eq!(outcome.overlay.label, "glioma");
    assert_eq!(outcome.overlay.line(MetricField::Depth).unwrap().value, "12.35");
    assert_eq!(host.renderable().unwrap().kind(), "surface");
    assert_eq!(backend.live(), 1);
    assert!(!backend.calls().contains(&Call::Release(1)));
}

#[test]
fn test_render_result_with_rejected_geometry_keeps_previous_scene() {
    let (mut host, backend) = host();
    let (requests, requester) = counting_requester();
    host.start(requester).unwrap();
    host.attach(triangle()).unwrap();

    let result = AnalysisResult::from_json(&json!({
        "tumor_type": "glioma",
        "metrics": { "depth_mm": 7.5 },
        "mesh": { "vertices": [0.0, 0.0, 0.0, 1.0], "faces": [] }
    }))
    .unwrap();
    let outcome = host.render_result(result);

    let ViewStatus::Malformed(reason) = &outcome.view else {
        panic!("expected a malformed view, got {:?}", outcome.view);
    };
    assert!(reason.contains("not a multiple of 3"), "{}", reason);
    assert_eq!(outcome.overlay.tone, OverlayTone::Success);
    assert_eq!(outcome.overlay.line(MetricField::Depth).unwrap().value, "7.50");
    assert_eq!(host.renderable().unwrap().kind(), "surface");
    assert_eq!(backend.calls(), vec![Call::Allocate(1)]);

    // the loop keeps drawing the kept scene
    assert!(host.is_running());
    assert_eq!(requests.get(), 2);
    assert!(host.frame().unwrap());
    assert_eq!(backend.calls().last(), Some(&Call::Draw(Some(1))));
}

#[test]
fn test_triangle_scenario() {
    let (mut host, _backend) = host();
    let (_, requester) = counting_requester();
    host.start(requester).unwrap();

    let outcome = host.render(
        Some(triangle()),
        &Metrics::with_depth(7.5),
        &ClassificationLabel::new("glioma"),
    );

    assert_eq!(
        outcome.view,
        ViewStatus::Ready {
            kind: "surface",
            vertex_count: 3,
            face_count: 1
        }
    );
    assert_eq!(outcome.overlay.tone, OverlayTone::Success);
    assert_eq!(outcome.overlay.line(MetricField::Depth).unwrap().value, "7.50");

    let renderable = host.renderable().unwrap();
    let sphere = renderable.bounding_sphere();
    assert_relative_eq!(sphere.center, Point3f::new(0.5, 0.5, 0.0), epsilon = 1e-6);
    assert_relative_eq!(sphere.radius, 0.5_f32.sqrt(), epsilon = 1e-6);
    assert_relative_eq!(renderable.camera_distance(), 3.0 * 0.5_f32.sqrt(), epsilon = 1e-5);
    assert_relative_eq!(
        renderable.translation(),
        Vector3::new(-0.5, -0.5, 0.0),
        epsilon = 1e-6
    );
    assert_relative_eq!(host.camera().distance(), 3.0 * 0.5_f32.sqrt(), epsilon = 1e-5);
}

#[test]
fn test_empty_geometry_uses_default_distance() {
    let (mut host, _backend) = host();
    let empty = BuiltGeometry::Surface(SurfaceGeometry {
        vertices: Vec::new(),
        indices: Vec::new(),
    });
    let renderable = host.attach_geometry(empty).unwrap();
    assert_eq!(renderable.camera_distance(), 5.0);
    assert_eq!(renderable.translation(), Vector3::zeros());
}

#[test]
fn test_single_point_uses_default_distance() {
    let (mut host, _backend) = host();
    let payload = Payload::from_json(&json!({
        "vertices": [[2.0, 2.0, 2.0]],
        "faces": []
    }))
    .unwrap();
    let renderable = host.attach(payload).unwrap();
    assert_eq!(renderable.camera_distance(), 5.0);
}

#[test]
fn test_frames_draw_until_canceled() {
    let (mut host, backend) = host();
    let (requests, requester) = counting_requester();
    let handle = host.start(requester).unwrap();
    host.attach(triangle()).unwrap();

    assert!(host.frame().unwrap());
    assert!(host.frame().unwrap());
    assert_eq!(backend.draws(), 2);
    assert_eq!(requests.get(), 3);

    handle.cancel();
    assert!(!host.frame().unwrap());
    assert_eq!(backend.draws(), 2);
    assert_eq!(requests.get(), 3);
}

#[test]
fn test_frame_uses_model_translation() {
    let (mut host, backend) = host();
    let (_, requester) = counting_requester();
    host.start(requester).unwrap();
    host.attach(triangle()).unwrap();
    host.frame().unwrap();

    let frame = backend.log.borrow().last_frame.unwrap();
    let moved = frame.model.transform_point(&Point3f::new(0.5, 0.5, 0.0));
    assert_relative_eq!(moved, Point3f::origin(), epsilon = 1e-6);
}

#[test]
fn test_frame_after_teardown_does_nothing() {
    let (mut host, backend) = host();
    let (_, requester) = counting_requester();
    host.start(requester).unwrap();
    host.teardown();

    assert!(!host.frame().unwrap());
    assert_eq!(backend.draws(), 0);
    assert!(host.attach(triangle()).is_err());
}

#[test]
fn test_frame_without_loop_does_nothing() {
    let (mut host, backend) = host();
    host.attach(triangle()).unwrap();
    assert!(!host.frame().unwrap());
    assert_eq!(backend.draws(), 0);
}

#[test]
fn test_restart_cancels_previous_loop() {
    let (mut host, _backend) = host();
    let (_, requester) = counting_requester();
    let first = host.start(requester.clone()).unwrap();
    let second = host.start(requester).unwrap();
    assert!(first.is_canceled());
    assert!(!second.is_canceled());
}

#[test]
fn test_allocation_failure_still_produces_overlay() {
    let (mut host, backend) = host();
    backend.fail_next_allocations(true);

    let outcome = host.render(
        Some(triangle()),
        &Metrics::with_depth(3.0),
        &ClassificationLabel::new("notumor"),
    );

    assert!(matches!(outcome.view, ViewStatus::Unavailable(_)));
    assert_eq!(outcome.overlay.tone, OverlayTone::Warning);
    assert_eq!(outcome.overlay.line(MetricField::Depth).unwrap().value, "3.00");
    assert_eq!(backend.live(), 0);
}

#[test]
fn test_render_without_payload_clears_scene() {
    let (mut host, backend) = host();
    host.attach(triangle()).unwrap();
    let outcome = host.render(None, &Metrics::default(), &ClassificationLabel::default());
    assert_eq!(outcome.view, ViewStatus::Empty);
    assert!(host.renderable().is_none());
    assert_eq!(backend.live(), 0);
    assert_eq!(outcome.overlay.label, "Unknown");
}

#[test]
fn test_render_result_from_service_response() {
    let (mut host, _backend) = host();
    let result = AnalysisResult::from_json(&json!({
        "tumor_type": "meningioma",
        "metrics": { "depth_mm": "4.2", "num_slices": 12 },
        "mesh": {
            "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            "faces": [[0, 1, 2]]
        }
    }))
    .unwrap();

    let outcome = host.render_result(result);
    assert!(outcome.view.is_ready());
    assert_eq!(outcome.overlay.label, "meningioma");
    assert_eq!(outcome.overlay.line(MetricField::Depth).unwrap().value, "4.20");
    assert_eq!(outcome.overlay.line(MetricField::NumSlices).unwrap().value, "12");
}

#[test]
fn test_resize_updates_aspect_and_backend() {
    let (mut host, backend) = host();
    host.resize(800, 400);
    assert_eq!(host.viewport(), (800, 400));
    assert_relative_eq!(host.camera().aspect_ratio, 2.0);
    assert!(backend.calls().contains(&Call::Resize(800, 400)));

    host.resize(0, 400);
    assert_eq!(host.viewport(), (800, 400));
}
