use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::frame::{Delivery, Frame};

/// Consumer side of a capture session
///
/// Yields frames in capture order and finishes for good once the end marker
/// arrives. If the bridge goes away without publishing one, the sequence
/// finishes as well.
#[derive(Debug)]
pub struct AudioSequence {
    rx: mpsc::UnboundedReceiver<Delivery>,
    finished: bool,
}

impl AudioSequence {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Wait for the next frame; `None` once the stream has ended
    pub async fn next(&mut self) -> Option<Frame> {
        futures::future::poll_fn(|cx| self.poll_frame(cx)).await
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn poll_frame(&mut self, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Delivery::Frame(frame))) => Poll::Ready(Some(frame)),
            Poll::Ready(Some(Delivery::End)) | Poll::Ready(None) => {
                self.finished = true;
                // Late frames from a worker that outlived its join are discarded
                self.rx.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Stream for AudioSequence {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.get_mut().poll_frame(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_end_is_permanent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut seq = AudioSequence::new(rx);

        tx.send(Delivery::Frame(Frame::copy_from(&[1, 0]))).unwrap();
        tx.send(Delivery::End).unwrap();
        let _ = tx.send(Delivery::Frame(Frame::copy_from(&[2, 0])));

        assert_eq!(seq.next().await, Some(Frame::copy_from(&[1, 0])));
        assert_eq!(seq.next().await, None);
        assert!(seq.is_finished());
        assert_eq!(seq.next().await, None);
    }

    #[tokio::test]
    async fn test_dropped_sender_ends_sequence() {
        let (tx, rx) = mpsc::unbounded_channel::<Delivery>();
        let mut seq = AudioSequence::new(rx);
        drop(tx);
        assert_eq!(seq.next().await, None);
    }
}
