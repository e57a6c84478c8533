//! A minimal controlled-station example: accept one connection, answer
//! interrogation and single commands, and push a periodic measurement
//! once data transfer is active.
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iec60870_core::asdu::{Asdu, InformationObject, TypeId};
use iec60870_core::common::{CauseOfTransmission, MeasuredQuality};
use iec60870_core::connection::{ConnectionHandle, ConnectionSettings};
use iec60870_core::elements::InformationElement;
use iec60870_core::endpoint::Endpoint;
use iec60870_core::error::IecError;
use iec60870_core::listener::ConnectionListener;
use tokio::sync::OnceCell;

struct StationListener {
    handle: Arc<OnceCell<ConnectionHandle>>,
}

#[async_trait]
impl ConnectionListener for StationListener {
    async fn on_asdu_received(&self, asdu: Asdu) {
        tracing::info!(?asdu, "received ASDU");
        let Some(handle) = self.handle.get() else {
            return;
        };

        match asdu.type_id {
            TypeId::CIcNa1 => {
                if let Err(err) = respond_to_interrogation(handle, &asdu).await {
                    tracing::warn!(%err, "failed to answer interrogation");
                }
            }
            TypeId::CScNa1 => {
                if let Err(err) = handle.send_confirmation(&asdu, Duration::from_secs(5)).await {
                    tracing::warn!(%err, "failed to confirm single command");
                }
            }
            _ => {}
        }
    }

    async fn on_connection_lost(&self, cause: IecError) {
        tracing::warn!(%cause, "connection lost");
    }
}

async fn respond_to_interrogation(handle: &ConnectionHandle, asdu: &Asdu) -> Result<(), IecError> {
    handle.send_confirmation(asdu, Duration::from_secs(5)).await?;

    let single_points = Asdu::new(
        TypeId::MSpNa1,
        false,
        CauseOfTransmission::StationInterrogation,
        0,
        asdu.common_address,
        vec![
            InformationObject::new(
                1001,
                vec![InformationElement::SinglePointInfo {
                    value: true,
                    quality: Default::default(),
                }],
            ),
            InformationObject::new(
                1002,
                vec![InformationElement::SinglePointInfo {
                    value: false,
                    quality: Default::default(),
                }],
            ),
        ],
    );
    handle.send(single_points, Duration::from_secs(5)).await?;

    let mut termination = asdu.clone();
    termination.cause = CauseOfTransmission::ActivationTermination;
    handle.send(termination, Duration::from_secs(5)).await
}

async fn send_periodic_measurement(handle: &ConnectionHandle, counter: i16) -> Result<(), IecError> {
    let measurement = Asdu::new(
        TypeId::MMeNb1,
        false,
        CauseOfTransmission::Periodic,
        0,
        1,
        vec![InformationObject::new(
            2001,
            vec![InformationElement::ScaledValue {
                raw: counter,
                quality: MeasuredQuality::new(),
            }],
        )],
    );
    handle.send(measurement, Duration::from_secs(5)).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let settings = ConnectionSettings::builder().build()?;
    let endpoint = Endpoint::bind("0.0.0.0:2404").await?;
    tracing::info!(addr = %endpoint.local_addr()?, "listening");

    let handle_cell = Arc::new(OnceCell::new());
    let listener = Arc::new(StationListener {
        handle: handle_cell.clone(),
    });

    let (handle, peer) = endpoint.accept(settings, listener).await?;
    tracing::info!(%peer, "client connected");
    let _ = handle_cell.set(handle.clone());

    let periodic_handle = handle.clone();
    let periodic_task = tokio::spawn(async move {
        let mut counter: i16 = 0;
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            counter = counter.wrapping_add(1);
            if let Err(err) = send_periodic_measurement(&periodic_handle, counter).await {
                tracing::warn!(%err, "periodic send failed, stopping");
                break;
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    periodic_task.abort();
    handle.close().await;

    Ok(())
}
