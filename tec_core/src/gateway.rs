//! Typed parameter access over a device session.
//!
//! The gateway owns the connection lifecycle. It starts `Disconnected`;
//! `connect()` opens a session on the configured port, identifies the device
//! and caches its address. Reads and writes issue one round-trip per
//! instance, in the order given, and never retry. A session error that
//! means the link is gone drops back to `Disconnected`, so every later call
//! fails with `NotConnected` until `connect()` succeeds again.

use tec_traits::{Address, BoxError, DeviceSession, Instance, SessionFactory};

use crate::error::{Result, TecError};
use crate::hw_error::map_hw_error;
use crate::params::Parameter;

enum Link<S> {
    Disconnected,
    Connected { session: S, address: Address },
}

pub struct DeviceGateway<F: SessionFactory> {
    factory: F,
    port: String,
    link: Link<F::Session>,
}

impl<F: SessionFactory> std::fmt::Debug for DeviceGateway<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceGateway")
            .field("port", &self.port)
            .field("address", &self.address())
            .finish()
    }
}

impl<F: SessionFactory> DeviceGateway<F> {
    pub fn new(factory: F, port: impl Into<String>) -> Self {
        Self {
            factory,
            port: port.into(),
            link: Link::Disconnected,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    /// Address of the connected device, if any.
    pub fn address(&self) -> Option<Address> {
        match &self.link {
            Link::Connected { address, .. } => Some(*address),
            Link::Disconnected => None,
        }
    }

    /// Open and identify the device. Returns the cached address when
    /// already connected.
    pub fn connect(&mut self) -> Result<Address> {
        if let Link::Connected { address, .. } = &self.link {
            return Ok(*address);
        }
        let mut session = self.factory.open(&self.port).map_err(|e| {
            let err = map_hw_error(&*e);
            tracing::error!(port = %self.port, error = %err, "device open failed");
            err
        })?;
        let address = session.identify().map_err(|e| {
            let err = map_hw_error(&*e);
            tracing::error!(port = %self.port, error = %err, "device identify failed");
            err
        })?;
        tracing::info!(port = %self.port, address, "device connected");
        self.link = Link::Connected { session, address };
        Ok(address)
    }

    pub fn disconnect(&mut self) {
        if self.is_connected() {
            tracing::info!(port = %self.port, "device disconnected");
        }
        self.link = Link::Disconnected;
    }

    /// Read `param` once per instance, results in instance order.
    pub fn read(&mut self, param: Parameter, instances: &[Instance]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(instances.len());
        self.read_into(param, instances, &mut out)?;
        Ok(out)
    }

    /// Like `read`, appending to `out`. On error, values read before the
    /// failing instance stay in `out`.
    pub fn read_into(
        &mut self,
        param: Parameter,
        instances: &[Instance],
        out: &mut Vec<f64>,
    ) -> Result<()> {
        for &instance in instances {
            let (session, address) = self.session()?;
            match session.get_parameter(param.id(), address, instance) {
                Ok(v) => out.push(v),
                Err(e) => return Err(self.fail("read", param, instance, e)),
            }
        }
        Ok(())
    }

    /// Write `value` to `param` on each instance, in order.
    pub fn write(&mut self, param: Parameter, value: f64, instances: &[Instance]) -> Result<()> {
        for &instance in instances {
            let (session, address) = self.session()?;
            if let Err(e) = session.set_parameter(param.id(), value, address, instance) {
                return Err(self.fail("write", param, instance, e));
            }
            tracing::debug!(param = param.name(), value, instance, "parameter written");
        }
        Ok(())
    }

    fn session(&mut self) -> Result<(&mut F::Session, Address)> {
        match &mut self.link {
            Link::Connected { session, address } => Ok((session, *address)),
            Link::Disconnected => Err(TecError::NotConnected),
        }
    }

    fn fail(&mut self, op: &str, param: Parameter, instance: Instance, e: BoxError) -> TecError {
        let err = map_hw_error(&*e);
        tracing::error!(
            op,
            param = param.name(),
            id = param.id(),
            instance,
            error = %err,
            "device request failed"
        );
        if matches!(err, TecError::LinkLost(_)) {
            tracing::warn!(port = %self.port, "link lost; reconnect required");
            self.link = Link::Disconnected;
        }
        err
    }
}
