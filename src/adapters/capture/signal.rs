//! Face sensor fed by an external presence signal
//!
//! Whoever owns the sender (an operator console, a detector process) publishes the latest
//! face-present verdict; every sensor subscribed to it samples that value.

use crate::error::Result;
use crate::ports::capture::FaceSensorPort;
use async_trait::async_trait;
use tokio::sync::watch;

/// Create a presence signal and a first sensor reading it
pub fn face_signal(initially_present: bool) -> (watch::Sender<bool>, SignalFaceSensor) {
    let (tx, rx) = watch::channel(initially_present);
    (tx, SignalFaceSensor::new(rx))
}

pub struct SignalFaceSensor {
    rx: watch::Receiver<bool>,
}

impl SignalFaceSensor {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl FaceSensorPort for SignalFaceSensor {
    async fn face_present(&mut self) -> Result<bool> {
        Ok(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sensors_follow_the_signal() {
        let (tx, mut first) = face_signal(true);
        let mut second = SignalFaceSensor::new(tx.subscribe());

        assert!(first.face_present().await.unwrap());
        assert!(second.face_present().await.unwrap());

        tx.send_replace(false);
        assert!(!first.face_present().await.unwrap());
        assert!(!second.face_present().await.unwrap());
    }
}
