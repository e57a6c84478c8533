//! # iec60870-core
//!
//! An asynchronous Rust implementation of the IEC 60870-5-104 telecontrol
//! protocol core: APCI framing, the ASDU/information-object catalogue, and
//! the connection state machine (STARTDT/STOPDT/TESTFR, sequence-number
//! windowing, t1/t2/t3 timers).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use iec60870_core::asdu::{Asdu, TypeId, InformationObject};
//! use iec60870_core::common::CauseOfTransmission;
//! use iec60870_core::connection::{ConnectionHandle, ConnectionSettings};
//! use iec60870_core::elements::InformationElement;
//! use iec60870_core::endpoint::connect;
//! use iec60870_core::error::IecError;
//! use iec60870_core::listener::ConnectionListener;
//!
//! struct Logger;
//!
//! #[async_trait]
//! impl ConnectionListener for Logger {
//!     async fn on_asdu_received(&self, asdu: Asdu) {
//!         println!("received {:?}", asdu);
//!     }
//!
//!     async fn on_connection_lost(&self, cause: IecError) {
//!         println!("connection lost: {}", cause);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConnectionSettings::builder().build()?;
//!     let handle: ConnectionHandle =
//!         connect("127.0.0.1:2404", settings, Arc::new(Logger)).await?;
//!
//!     handle.start_data_transfer().await?;
//!
//!     let interrogation = Asdu::new(
//!         TypeId::CIcNa1,
//!         false,
//!         CauseOfTransmission::Activation,
//!         0,
//!         1,
//!         vec![InformationObject::new(0, vec![InformationElement::QualifierOfInterrogation(20)])],
//!     );
//!     handle.send(interrogation, Duration::from_secs(5)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod apdu;
pub mod asdu;
pub mod common;
pub mod connection;
pub mod elements;
pub mod endpoint;
pub mod error;
pub mod listener;

pub use crate::apdu::{Apci, Apdu, UFrameFunction};
pub use crate::asdu::{Asdu, AsduPayload, InformationObject, TypeId, WireFormat};
pub use crate::common::{CauseOfTransmission, MeasuredQuality, QualityDescriptor};
pub use crate::connection::{ConnectionHandle, ConnectionSettings, ConnectionState};
pub use crate::elements::{Cp16Time2a, Cp24Time2a, Cp56Time2a, ElementKind, InformationElement};
pub use crate::endpoint::{connect, Endpoint};
pub use crate::error::{IecError, IecResult};
pub use crate::listener::ConnectionListener;
