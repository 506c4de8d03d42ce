//! TEC controller driver
//!
//! [`Tec`] owns one transport session and turns parameter reads and writes into
//! verified MeCom exchanges. Every reply, reads included, must pass checksum and
//! sequence-number verification before its payload is trusted; a failed check is an
//! error, never a placeholder value.

use crate::error::{Result, TecError};
use crate::parameters::{self, ParameterSpec};
use crate::transport::{ReplyReader, Transport, TransportError, TransportStats};
use mecom::{
    build_read, build_reset, build_write, checksum, verify_strict, DeviceAddress, Frame,
    MeComError, Message, ParameterValue, RandomSequence, SequenceSource, Value, ValueKind,
};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timed-out requests whose replies may still turn up
const MAX_ABANDONED: usize = 8;

/// Product identification read by [`Tec::device_info`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_type: u32,
    pub hardware_version: u32,
    pub firmware_version: u32,
    pub serial_number: u32,
    pub device_status: u32,
}

/// Temperature controller gains of one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidParameters {
    pub kp: f32,
    pub ti: f32,
    pub td: f32,
}

/// Driver for one controller on one transport
///
/// One request is outstanding at a time. When an exchange fails in a way that can
/// leave reply bytes on the link (timeout, unverifiable or garbled reply), the next
/// exchange starts by clearing the input. A reply to a timed-out request that still
/// arrives after that is recognised by its sequence number and skipped.
#[derive(Debug)]
pub struct Tec<T: Transport> {
    transport: T,
    device_addr: DeviceAddress,
    default_instance: u8,
    sequence: Box<dyn SequenceSource>,
    reader: ReplyReader,
    abandoned: VecDeque<u16>,
    resync_pending: bool,
}

impl<T: Transport> Tec<T> {
    /// Driver drawing random sequence numbers, default instance 1
    pub fn new(transport: T, device_addr: DeviceAddress) -> Self {
        Self {
            transport,
            device_addr,
            default_instance: 1,
            sequence: Box::new(RandomSequence),
            reader: ReplyReader::new(),
            abandoned: VecDeque::new(),
            resync_pending: false,
        }
    }

    pub fn with_sequence(mut self, source: impl SequenceSource + 'static) -> Self {
        self.sequence = Box::new(source);
        self
    }

    pub fn with_default_instance(mut self, instance: u8) -> Self {
        self.default_instance = instance;
        self
    }

    pub fn device_addr(&self) -> DeviceAddress {
        self.device_addr
    }

    pub fn default_instance(&self) -> u8 {
        self.default_instance
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub async fn connect(&mut self) -> Result<()> {
        if !self.transport.is_connected().await {
            self.transport.connect().await?;
        }
        info!(
            "TEC at address {} reachable via {}",
            self.device_addr,
            self.transport.name()
        );
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Drop stale input, e.g. a late reply to a request that already timed out
    pub async fn clear(&mut self) -> Result<()> {
        self.reader.clear();
        self.transport.clear().await?;
        self.resync_pending = false;
        Ok(())
    }

    /// Link counters and state of the underlying transport
    pub async fn link_stats(&self) -> TransportStats {
        self.transport.stats().await
    }

    /// Read a parameter; the value kind follows from `V`
    pub async fn get_parameter<V: ParameterValue>(
        &mut self,
        param_id: u16,
        instance: u8,
    ) -> Result<V> {
        let value = self.get_value(param_id, V::KIND, instance).await?;
        V::from_value(value).ok_or_else(|| {
            TecError::Protocol(MeComError::decode(format!(
                "parameter {} did not decode as {}",
                param_id,
                V::KIND
            )))
        })
    }

    /// Write a parameter and wait for the verified acknowledgement
    pub async fn set_parameter<V: ParameterValue>(
        &mut self,
        param_id: u16,
        value: V,
        instance: u8,
    ) -> Result<()> {
        self.set_value(param_id, value.into_value(), instance).await
    }

    /// Read a parameter whose kind is only known at runtime
    pub async fn get_value(
        &mut self,
        param_id: u16,
        kind: ValueKind,
        instance: u8,
    ) -> Result<Value> {
        let seq = self.sequence.next_sequence();
        let frame = build_read(self.device_addr, param_id, instance, Some(seq));
        let reply = self.exchange(&frame, kind).await?;
        let value = reply.value()?;
        debug!("Read parameter {}.{} = {}", param_id, instance, value);
        Ok(value)
    }

    pub async fn set_value(&mut self, param_id: u16, value: Value, instance: u8) -> Result<()> {
        let seq = self.sequence.next_sequence();
        let frame = build_write(self.device_addr, param_id, instance, value, Some(seq));
        self.exchange(&frame, value.kind()).await?;
        debug!("Set parameter {}.{} = {}", param_id, instance, value);
        Ok(())
    }

    /// Reset the device; it acknowledges before rebooting
    pub async fn reset(&mut self) -> Result<()> {
        let seq = self.sequence.next_sequence();
        let frame = build_reset(self.device_addr, Some(seq));
        self.exchange(&frame, ValueKind::Int).await?;
        info!("TEC at address {} acknowledged reset", self.device_addr);
        Ok(())
    }

    /// Read a catalog parameter by name or decimal ID
    pub async fn get_named(&mut self, name: &str, instance: Option<u8>) -> Result<Value> {
        let spec = resolve(name)?;
        let instance = instance.unwrap_or(self.default_instance);
        self.get_value(spec.id, spec.kind, instance).await
    }

    /// Write a catalog parameter by name or decimal ID
    ///
    /// Read-only entries and values of the wrong kind are rejected before anything
    /// is sent.
    pub async fn set_named(
        &mut self,
        name: &str,
        value: Value,
        instance: Option<u8>,
    ) -> Result<()> {
        let spec = resolve(name)?;
        if !spec.access.is_writable() {
            return Err(TecError::ReadOnly(spec.name.to_string()));
        }
        if value.kind() != spec.kind {
            return Err(TecError::Protocol(MeComError::validation(format!(
                "{} expects a {} value, got {}",
                spec.name,
                spec.kind,
                value.kind()
            ))));
        }
        let instance = instance.unwrap_or(self.default_instance);
        self.set_value(spec.id, value, instance).await
    }

    /// Send one frame and return the verified reply
    async fn exchange(&mut self, frame: &Frame, kind: ValueKind) -> Result<Message> {
        let request = frame.to_message(kind)?;
        if self.resync_pending {
            let stale = self.reader.clear();
            self.transport.clear().await?;
            self.resync_pending = false;
            debug!("Cleared link input before next request ({} bytes buffered)", stale);
        }

        let result = self.transact(frame, &request, kind).await;
        match &result {
            Err(TecError::Transport(TransportError::Timeout(_))) => {
                if self.abandoned.len() == MAX_ABANDONED {
                    self.abandoned.pop_front();
                }
                self.abandoned.push_back(request.sequence_number());
                self.resync_pending = true;
            },
            Err(TecError::Transport(TransportError::ReceiveFailed(_)))
            | Err(TecError::Protocol(MeComError::Parse(_)))
            | Err(TecError::Protocol(MeComError::Verification(_))) => {
                self.resync_pending = true;
            },
            _ => {},
        }
        result
    }

    async fn transact(
        &mut self,
        frame: &Frame,
        request: &Message,
        kind: ValueKind,
    ) -> Result<Message> {
        self.transport.send(frame.as_bytes()).await?;
        let deadline = Instant::now() + self.transport.timeout();

        let reply = loop {
            let raw = self.reader.read_reply(&mut self.transport, deadline).await?;
            let reply = Message::parse(&raw, kind)?;
            if let Some(pos) = self.late_reply(&reply, request) {
                self.abandoned.remove(pos);
                debug!(
                    "Skipped late reply to abandoned request {:04X}",
                    reply.sequence_number()
                );
                continue;
            }
            break reply;
        };

        verify_strict(&reply, request)?;

        if let Some(err) = reply.device_error() {
            warn!(
                "TEC at address {} rejected {}: {}",
                self.device_addr,
                frame.command().code(),
                err
            );
            return Err(err.into());
        }

        Ok(reply)
    }

    /// Position in `abandoned` of an intact reply meant for an earlier request
    fn late_reply(&self, reply: &Message, request: &Message) -> Option<usize> {
        let seq = reply.sequence_number();
        if seq == request.sequence_number() || checksum(reply.body()) != reply.checksum() {
            return None;
        }
        self.abandoned.iter().position(|&s| s == seq)
    }

    // Common product parameters

    pub async fn device_type(&mut self) -> Result<u32> {
        self.get_parameter(100, 1).await
    }

    pub async fn hardware_version(&mut self) -> Result<u32> {
        self.get_parameter(101, 1).await
    }

    pub async fn serial_number(&mut self) -> Result<u32> {
        self.get_parameter(102, 1).await
    }

    pub async fn firmware_version(&mut self) -> Result<u32> {
        self.get_parameter(103, 1).await
    }

    /// 0 Init, 1 Ready, 2 Run, 3 Error, 4 Bootloader, 5 Reset pending
    pub async fn device_status(&mut self) -> Result<u32> {
        self.get_parameter(104, 1).await
    }

    pub async fn error_number(&mut self) -> Result<u32> {
        self.get_parameter(105, 1).await
    }

    pub async fn error_instance(&mut self) -> Result<u32> {
        self.get_parameter(106, 1).await
    }

    pub async fn error_parameter(&mut self) -> Result<u32> {
        self.get_parameter(107, 1).await
    }

    pub async fn device_info(&mut self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            device_type: self.device_type().await?,
            hardware_version: self.hardware_version().await?,
            firmware_version: self.firmware_version().await?,
            serial_number: self.serial_number().await?,
            device_status: self.device_status().await?,
        })
    }

    // Monitor

    pub async fn object_temperature(&mut self, instance: u8) -> Result<f32> {
        self.get_parameter(1000, instance).await
    }

    pub async fn sink_temperature(&mut self, instance: u8) -> Result<f32> {
        self.get_parameter(1001, instance).await
    }

    pub async fn actual_output_current(&mut self, instance: u8) -> Result<f32> {
        self.get_parameter(1020, instance).await
    }

    pub async fn actual_output_voltage(&mut self, instance: u8) -> Result<f32> {
        self.get_parameter(1021, instance).await
    }

    pub async fn driver_status(&mut self, instance: u8) -> Result<u32> {
        self.get_parameter(1080, instance).await
    }

    /// 0 Regulation not active, 1 Not stable, 2 Stable
    pub async fn temperature_stability(&mut self, instance: u8) -> Result<u32> {
        self.get_parameter(1200, instance).await
    }

    // Operation

    /// 0 Static OFF, 1 Static ON, 2 Live OFF/ON, 3 HW Enable
    pub async fn output_stage_status(&mut self, instance: u8) -> Result<u32> {
        self.get_parameter(2010, instance).await
    }

    pub async fn set_output_stage_status(&mut self, status: u32, instance: u8) -> Result<()> {
        self.set_parameter(2010, status, instance).await
    }

    // Temperature control

    pub async fn target_object_temperature(&mut self, instance: u8) -> Result<f32> {
        self.get_parameter(3000, instance).await
    }

    pub async fn set_target_object_temperature(
        &mut self,
        celsius: f32,
        instance: u8,
    ) -> Result<()> {
        self.set_parameter(3000, celsius, instance).await
    }

    pub async fn pid_parameters(&mut self, instance: u8) -> Result<PidParameters> {
        Ok(PidParameters {
            kp: self.get_parameter(3010, instance).await?,
            ti: self.get_parameter(3011, instance).await?,
            td: self.get_parameter(3012, instance).await?,
        })
    }

    pub async fn set_pid_parameters(&mut self, pid: PidParameters, instance: u8) -> Result<()> {
        self.set_parameter(3010, pid.kp, instance).await?;
        self.set_parameter(3011, pid.ti, instance).await?;
        self.set_parameter(3012, pid.td, instance).await
    }
}

fn resolve(name: &str) -> Result<&'static ParameterSpec> {
    parameters::resolve(name).ok_or_else(|| TecError::unknown_parameter(name.to_string()))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::{ConnectionState, MockTransport, MockTransportConfig};
    use mecom::{checksum, CountingSequence, FixedSequence, SequenceNumber, VerificationFailure};

    /// Reply the controller at `addr` would send for sequence `seq`
    fn reply(addr: u8, seq: u16, payload: &str) -> String {
        let body = format!("!{:02X}{:04X}{}", addr, seq, payload);
        format!("{}{}\r", body, checksum(&body))
    }

    fn driver(mock: &MockTransport, seq: u16) -> Tec<MockTransport> {
        Tec::new(mock.clone(), DeviceAddress::from(123))
            .with_sequence(FixedSequence(SequenceNumber::from(seq)))
    }

    /// Queue `lines` once the driver has cleared the link input
    fn respond_after_clear(mock: &MockTransport, lines: Vec<String>) {
        let mock = mock.clone();
        tokio::spawn(async move {
            while mock.clear_calls().await == 0 {
                tokio::task::yield_now().await;
            }
            for line in lines {
                mock.add_response(&line).await;
            }
        });
    }

    #[tokio::test]
    async fn test_get_float_parameter() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 61234, "41C8CCCD")).await;
        let mut tec = driver(&mock, 61234);

        let value: f32 = tec.get_parameter(1000, 230).await.unwrap();
        assert_eq!(value, 25.1);
        assert_eq!(mock.sent_frames().await, vec!["#7BEF32?VR03E8E69AAD\r"]);
    }

    #[tokio::test]
    async fn test_set_int_parameter_literal_frame() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(230, 59999, "")).await;
        let mut tec = Tec::new(mock.clone(), DeviceAddress::from(230))
            .with_sequence(FixedSequence(SequenceNumber::from(59999)));

        tec.set_parameter(2021, 25u32, 123).await.unwrap();
        assert_eq!(
            mock.sent_frames().await,
            vec!["#E6EA5FVS07E57B0000001958B0\r"]
        );
    }

    #[tokio::test]
    async fn test_set_float_parameter_literal_frame() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 61234, "")).await;
        let mut tec = driver(&mock, 61234);

        tec.set_parameter(1000, 25.1f32, 230).await.unwrap();
        assert_eq!(
            mock.sent_frames().await,
            vec!["#7BEF32VS03E8E641C8CCCDE2C1\r"]
        );
    }

    #[tokio::test]
    async fn test_reset() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 12345, "")).await;
        let mut tec = driver(&mock, 12345);

        tec.reset().await.unwrap();
        assert_eq!(mock.sent_frames().await, vec!["#7B3039RSB5BB\r"]);
    }

    #[tokio::test]
    async fn test_read_with_wrong_sequence_is_error() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 1, "41C8CCCD")).await;
        let mut tec = driver(&mock, 2);

        let err = tec.get_parameter::<f32>(1000, 1).await.unwrap_err();
        assert_eq!(
            err,
            TecError::Protocol(MeComError::Verification(
                VerificationFailure::SequenceMismatch {
                    expected: 2,
                    received: 1,
                }
            ))
        );
    }

    #[tokio::test]
    async fn test_read_with_bad_checksum_is_error() {
        let mock = MockTransport::connected();
        let mut corrupted = reply(123, 7, "41C8CCCD");
        corrupted.replace_range(8..9, "5");
        mock.add_response(&corrupted).await;
        let mut tec = driver(&mock, 7);

        let err = tec.get_parameter::<f32>(1000, 1).await.unwrap_err();
        assert!(matches!(
            err,
            TecError::Protocol(MeComError::Verification(
                VerificationFailure::ChecksumMismatch { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_write_not_acknowledged() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 99, "")).await;
        let mut tec = driver(&mock, 100);

        let err = tec.set_parameter(3000, 20.0f32, 1).await.unwrap_err();
        assert!(matches!(err, TecError::Protocol(MeComError::Verification(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_device_error_frame() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 5, "+05")).await;
        let mut tec = driver(&mock, 5);

        let err = tec.get_parameter::<f32>(4242, 1).await.unwrap_err();
        assert_eq!(
            err,
            TecError::Device {
                code: 5,
                description: "Parameter not available".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_garbled_reply_is_parse_error() {
        let mock = MockTransport::connected();
        mock.add_response("!7B\r").await;
        let mut tec = driver(&mock, 1);

        let err = tec.device_type().await.unwrap_err();
        assert!(matches!(err, TecError::Protocol(MeComError::Parse(_))));
    }

    #[tokio::test]
    async fn test_short_payload_is_decode_error() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 3, "0019")).await;
        let mut tec = driver(&mock, 3);

        let err = tec.get_parameter::<u32>(104, 1).await.unwrap_err();
        assert!(matches!(err, TecError::Protocol(MeComError::Decode(_))));
    }

    #[tokio::test]
    async fn test_timeout_passes_through() {
        let mock = MockTransport::connected();
        let mut tec = driver(&mock, 1);

        let err = tec.object_temperature(1).await.unwrap_err();
        assert!(matches!(err, TecError::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_signed_int_parameter() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 4, "FFFFFFFE")).await;
        let mut tec = driver(&mock, 4);

        let value: i32 = tec.get_parameter(3034, 1).await.unwrap();
        assert_eq!(value, -2);
    }

    #[tokio::test]
    async fn test_device_info_uses_consecutive_sequences() {
        let mock = MockTransport::connected();
        for (seq, payload) in [
            (10u16, "00000462"), // 1122
            (11, "00000096"),    // 150
            (12, "000001C2"),    // 450
            (13, "00003039"),    // 12345
            (14, "00000002"),    // Run
        ] {
            mock.add_response(&reply(1, seq, payload)).await;
        }
        let mut tec = Tec::new(mock.clone(), DeviceAddress::from(1))
            .with_sequence(CountingSequence::starting_at(10));

        let info = tec.device_info().await.unwrap();
        assert_eq!(
            info,
            DeviceInfo {
                device_type: 1122,
                hardware_version: 150,
                firmware_version: 450,
                serial_number: 12345,
                device_status: 2,
            }
        );
        assert_eq!(mock.sent_frames().await.len(), 5);
    }

    #[tokio::test]
    async fn test_get_named_uses_catalog_kind_and_default_instance() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 8, "41C8CCCD")).await;
        let mut tec = driver(&mock, 8).with_default_instance(2);

        let value = tec.get_named("sink_temperature", None).await.unwrap();
        assert_eq!(value, Value::Float(25.1));
        // parameter 1001 (03E9), instance 2
        assert!(mock.sent_frames().await[0].starts_with("#7B0008?VR03E902"));
    }

    #[tokio::test]
    async fn test_set_named_read_only_sends_nothing() {
        let mock = MockTransport::connected();
        let mut tec = driver(&mock, 1);

        let err = tec
            .set_named("object_temperature", Value::Float(20.0), None)
            .await
            .unwrap_err();
        assert_eq!(err, TecError::ReadOnly("object_temperature".to_string()));
        assert!(mock.sent_frames().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_named_rejects_wrong_kind_and_unknown_name() {
        let mock = MockTransport::connected();
        let mut tec = driver(&mock, 1);

        let err = tec
            .set_named("target_object_temperature", Value::Int(20), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TecError::Protocol(MeComError::Validation(_))));

        let err = tec.get_named("warp_drive", None).await.unwrap_err();
        assert!(matches!(err, TecError::UnknownParameter(_)));
        assert!(mock.sent_frames().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_named_by_id() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 9, "")).await;
        let mut tec = driver(&mock, 9);

        tec.set_named("2010", Value::Int(1), Some(1)).await.unwrap();
        assert!(mock.sent_frames().await[0].starts_with("#7B0009VS07DA0100000001"));
    }

    #[tokio::test]
    async fn test_pid_parameters_round_trip() {
        let mock = MockTransport::connected();
        for seq in 0..3u16 {
            mock.add_response(&reply(123, seq, "")).await;
        }
        let mut tec = Tec::new(mock.clone(), DeviceAddress::from(123))
            .with_sequence(CountingSequence::default());

        let pid = PidParameters {
            kp: 10.0,
            ti: 300.0,
            td: 0.0,
        };
        tec.set_pid_parameters(pid, 1).await.unwrap();

        let sent = mock.sent_frames().await;
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("VS0BC20141200000")); // 3010, 10.0
        assert!(sent[1].contains("VS0BC30143960000")); // 3011, 300.0
        assert!(sent[2].contains("VS0BC40100000000")); // 3012, 0.0
    }

    #[tokio::test]
    async fn test_clear_delegates_to_transport() {
        let mock = MockTransport::connected();
        mock.add_response("!stale reply\r").await;
        let mut tec = driver(&mock, 1);

        tec.clear().await.unwrap();
        assert_eq!(mock.clear_calls().await, 1);
        assert_eq!(mock.pending_responses().await, 0);
    }

    #[tokio::test]
    async fn test_late_reply_after_timeout_is_skipped() {
        let mock = MockTransport::connected();
        let mut tec = Tec::new(mock.clone(), DeviceAddress::from(123))
            .with_sequence(CountingSequence::starting_at(10));

        let err = tec.object_temperature(1).await.unwrap_err();
        assert!(matches!(err, TecError::Transport(TransportError::Timeout(_))));
        assert_eq!(mock.clear_calls().await, 0);

        // the answer to request 10 shows up right ahead of the answer to 11
        respond_after_clear(
            &mock,
            vec![reply(123, 10, "41C8CCCD"), reply(123, 11, "41A00000")],
        );
        let value = tec.object_temperature(1).await.unwrap();
        assert_eq!(value, 20.0);
        assert_eq!(mock.clear_calls().await, 1);
        assert_eq!(mock.pending_responses().await, 0);
    }

    #[tokio::test]
    async fn test_late_reply_is_skipped_only_once() {
        let mock = MockTransport::connected();
        let mut tec = Tec::new(mock.clone(), DeviceAddress::from(123))
            .with_sequence(CountingSequence::starting_at(10));
        tec.object_temperature(1).await.unwrap_err();

        respond_after_clear(
            &mock,
            vec![reply(123, 10, "41C8CCCD"), reply(123, 11, "41A00000")],
        );
        tec.object_temperature(1).await.unwrap();

        // a second copy of reply 10 is no longer expected
        mock.add_response(&reply(123, 10, "41C8CCCD")).await;
        let err = tec.object_temperature(1).await.unwrap_err();
        assert_eq!(
            err,
            TecError::Protocol(MeComError::Verification(
                VerificationFailure::SequenceMismatch {
                    expected: 12,
                    received: 10,
                }
            ))
        );
    }

    #[tokio::test]
    async fn test_rejected_reply_clears_input_before_next_request() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 1, "41C8CCCD")).await;
        mock.add_receive_data(b"!7B00".to_vec()).await;
        let mut tec = driver(&mock, 2);

        tec.object_temperature(1).await.unwrap_err();
        assert_eq!(mock.pending_responses().await, 1);

        respond_after_clear(&mock, vec![reply(123, 2, "41A00000")]);
        let value = tec.object_temperature(1).await.unwrap();
        assert_eq!(value, 20.0);
        assert_eq!(mock.clear_calls().await, 1);
        assert_eq!(tec.link_stats().await.bytes_discarded, 5);
    }

    #[tokio::test]
    async fn test_device_error_needs_no_clear() {
        let mock = MockTransport::connected();
        mock.add_response(&reply(123, 5, "+05")).await;
        mock.add_response(&reply(123, 5, "41A00000")).await;
        let mut tec = driver(&mock, 5);

        tec.object_temperature(1).await.unwrap_err();
        assert_eq!(tec.object_temperature(1).await.unwrap(), 20.0);
        assert_eq!(mock.clear_calls().await, 0);
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_as_transport_error() {
        let mock = MockTransport::connected();
        mock.set_send_failure(true).await;
        let mut tec = driver(&mock, 1);

        let err = tec.object_temperature(1).await.unwrap_err();
        assert!(matches!(err, TecError::Transport(TransportError::SendFailed(_))));
        assert!(!err.is_retryable());
        assert_eq!(
            tec.link_stats().await.connection_state,
            ConnectionState::Error
        );
    }

    #[tokio::test]
    async fn test_receive_failure_surfaces_as_transport_error() {
        let mock = MockTransport::connected();
        mock.set_receive_failure(true).await;
        let mut tec = driver(&mock, 1);

        let err = tec.object_temperature(1).await.unwrap_err();
        assert!(matches!(err, TecError::Transport(TransportError::ReceiveFailed(_))));
        assert_eq!(mock.sent_frames().await.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_as_transport_error() {
        let config = MockTransportConfig {
            auto_connect: false,
            ..MockTransportConfig::default()
        };
        let mock = MockTransport::new(config).unwrap();
        mock.set_connection_failure(true).await;
        let mut tec = driver(&mock, 1);

        let err = tec.connect().await.unwrap_err();
        assert!(matches!(err, TecError::Transport(TransportError::ConnectionFailed(_))));

        let stats = tec.link_stats().await;
        assert_eq!(stats.connection_attempts, 1);
        assert_eq!(stats.failed_connections, 1);
    }
}
