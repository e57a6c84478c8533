//! Patterns for handling the errors a connection can surface: simple `?`
//! propagation, matching on specific variants, and choosing to continue
//! past a non-fatal one.
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iec60870_core::asdu::{Asdu, InformationObject, TypeId};
use iec60870_core::common::CauseOfTransmission;
use iec60870_core::connection::{ConnectionHandle, ConnectionSettings};
use iec60870_core::elements::InformationElement;
use iec60870_core::endpoint::connect;
use iec60870_core::error::IecError;
use iec60870_core::listener::ConnectionListener;

struct SilentListener;

#[async_trait]
impl ConnectionListener for SilentListener {
    async fn on_asdu_received(&self, _asdu: Asdu) {}
    async fn on_connection_lost(&self, _cause: IecError) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    println!("Example 1: basic propagation with ?");
    match basic_propagation().await {
        Ok(_) => println!("Success!"),
        Err(e) => println!("Error: {}", e),
    }

    println!("\nExample 2: matching on specific variants");
    match detailed_handling().await {
        Ok(_) => println!("Success!"),
        Err(IecError::WindowExhausted) => {
            println!("Send window never freed up in time; connection is still usable.");
        }
        Err(IecError::NotStarted) => {
            println!("Tried to send before STARTDT was confirmed.");
        }
        Err(IecError::IoError(e)) => {
            println!("Transport-level failure: {}", e);
        }
        Err(e) => println!("Other error: {}", e),
    }

    Ok(())
}

async fn basic_propagation() -> Result<ConnectionHandle, IecError> {
    let settings = ConnectionSettings::builder()
        .with_t1(Duration::from_secs(5))
        .build()?;

    // Almost certainly nothing is listening here; `?` propagates the
    // connection failure as-is.
    let handle = connect("192.0.2.1:2404", settings, Arc::new(SilentListener)).await?;
    handle.start_data_transfer().await?;
    Ok(handle)
}

async fn detailed_handling() -> Result<(), IecError> {
    let settings = ConnectionSettings::builder().build()?;
    let handle = connect("192.0.2.1:2404", settings, Arc::new(SilentListener)).await?;

    // Sending before start_data_transfer() completes is a common mistake;
    // NotStarted distinguishes it from a transport failure.
    let probe = Asdu::new(
        TypeId::CIcNa1,
        false,
        CauseOfTransmission::Activation,
        0,
        1,
        vec![InformationObject::new(0, vec![InformationElement::QualifierOfInterrogation(20)])],
    );
    handle.send(probe, Duration::from_millis(200)).await?;

    Ok(())
}
