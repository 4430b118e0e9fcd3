use super::*;

#[test]
fn surface_requires_lock_before_post() {
    let posted = PostedFrames::default();
    let mut surface = posted.surface(2, 2);

    assert!(surface.unlock_canvas_and_post(FrameRGBA::new(2, 2)).is_err());

    let canvas = surface.lock_canvas().unwrap();
    assert!(surface.lock_canvas().is_err());
    surface.unlock_canvas_and_post(canvas).unwrap();

    let frames = posted.take_all().unwrap();
    assert_eq!(frames.len(), 1);
    assert!(posted.take_all().unwrap().is_empty());
}

#[test]
fn surface_rejects_wrong_size_and_use_after_release() {
    let posted = PostedFrames::default();
    let mut surface = posted.surface(2, 2);

    surface.lock_canvas().unwrap();
    assert!(surface.unlock_canvas_and_post(FrameRGBA::new(3, 2)).is_err());

    surface.release();
    assert!(surface.lock_canvas().is_err());
}

#[test]
fn output_queue_reuses_released_slots() {
    let mut q = OutputQueue::default();
    let mut info = BufferInfo::default();
    assert_eq!(q.dequeue(&mut info), None);

    q.push(
        BufferInfo {
            size: 1,
            ..Default::default()
        },
        vec![1],
    );
    q.push(
        BufferInfo {
            size: 2,
            ..Default::default()
        },
        vec![2, 2],
    );

    let a = q.dequeue(&mut info).unwrap();
    assert_eq!((a, info.size), (0, 1));
    let b = q.dequeue(&mut info).unwrap();
    assert_eq!((b, info.size), (1, 2));
    assert_eq!(q.get(b).unwrap(), &[2, 2]);
    assert_eq!(q.in_flight(), 2);

    q.release(a).unwrap();
    assert!(q.release(a).is_err());
    assert!(q.get(a).is_err());

    q.push(BufferInfo::default(), vec![3]);
    assert_eq!(q.dequeue(&mut info), Some(0));
}
