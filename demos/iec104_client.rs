//! A minimal controlling-station example: connect, start data transfer,
//! send a station interrogation, and print everything the server sends
//! back.
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iec60870_core::asdu::{Asdu, InformationObject, TypeId};
use iec60870_core::common::CauseOfTransmission;
use iec60870_core::connection::ConnectionSettings;
use iec60870_core::elements::InformationElement;
use iec60870_core::endpoint::connect;
use iec60870_core::error::IecError;
use iec60870_core::listener::ConnectionListener;

struct PrintingListener;

#[async_trait]
impl ConnectionListener for PrintingListener {
    async fn on_asdu_received(&self, asdu: Asdu) {
        tracing::info!(?asdu, "received ASDU");
    }

    async fn on_connection_lost(&self, cause: IecError) {
        tracing::warn!(%cause, "connection lost");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let settings = ConnectionSettings::builder()
        .with_t1(Duration::from_secs(15))
        .with_t3(Duration::from_secs(20))
        .build()?;

    let handle = connect("127.0.0.1:2404", settings, Arc::new(PrintingListener)).await?;

    handle.start_data_transfer().await?;
    tracing::info!("data transfer started");

    let interrogation = Asdu::new(
        TypeId::CIcNa1,
        false,
        CauseOfTransmission::Activation,
        0,
        1,
        vec![InformationObject::new(
            0,
            vec![InformationElement::QualifierOfInterrogation(20)],
        )],
    );
    handle.send(interrogation, Duration::from_secs(5)).await?;

    tokio::time::sleep(Duration::from_secs(10)).await;

    handle.stop_data_transfer().await?;
    handle.close().await;

    Ok(())
}
