use bridge::{Frame, FrameBuffer};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_returns_fresh_frame_without_blocking() {
    let buffer = Arc::new(FrameBuffer::new());
    buffer.publish(Frame::from(&b"ready"[..]));

    let (frame, generation) = buffer
        .await_next_async(0, Duration::from_millis(100))
        .await
        .expect("frame already published");

    assert_eq!(&frame[..], b"ready");
    assert_eq!(generation, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_is_woken_by_publish() {
    let buffer = Arc::new(FrameBuffer::new());

    let waiter = {
        let buffer = Arc::clone(&buffer);
        tokio::spawn(async move { buffer.await_next_async(0, Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    buffer.publish(Frame::from(&b"woken"[..]));

    let (frame, generation) = waiter.await.unwrap().expect("publish should wake waiter");
    assert_eq!(&frame[..], b"woken");
    assert_eq!(generation, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_wait_times_out_when_producer_is_silent() {
    let buffer = Arc::new(FrameBuffer::new());
    buffer.publish(Frame::from(&b"stale"[..]));

    let next = buffer.await_next_async(1, Duration::from_millis(50)).await;
    assert!(next.is_none(), "no frame newer than generation 1 exists");
}
