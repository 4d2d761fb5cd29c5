use std::time::Duration;

use log::info;
use serialport::SerialPort;
use shared::error::SharedError;

use crate::commands::{self, DeviceCommand, TransportProvider};
use crate::transport::{detect_first_serial_port, open_serial_port};
use crate::{Cli, Command};

pub struct SerialTransportProvider;

impl TransportProvider for SerialTransportProvider {
    type Transport = dyn SerialPort;

    fn connect(&self, cli: &Cli, port_path: &str) -> Result<Box<Self::Transport>, SharedError> {
        open_serial_port(port_path, cli.baud, Duration::from_millis(cli.timeout_ms))
    }
}

pub fn select_port(cli: &Cli) -> Result<String, SharedError> {
    match &cli.port {
        Some(port) => Ok(port.clone()),
        None => detect_first_serial_port(cli.any_port),
    }
}

pub fn connect_transport<P>(
    cli: &Cli,
    transport_provider: &P,
) -> Result<Box<P::Transport>, SharedError>
where
    P: TransportProvider,
{
    let port_path = select_port(cli)?;
    info!("connecting to signer on {port_path} at {} baud", cli.baud);
    transport_provider.connect(cli, &port_path)
}

/// Offline key tooling runs without touching a serial port.
pub fn execute<P>(cli: Cli, transport_provider: &P) -> Result<(), SharedError>
where
    P: TransportProvider,
{
    let command = match &cli.command {
        Command::Keygen(args) => return commands::keygen::run(args),
        Command::Derive(args) => return commands::derive::run(args),
        Command::WaitReady => DeviceCommand::WaitReady,
        Command::PublicKey => DeviceCommand::PublicKey,
        Command::Challenge(args) => DeviceCommand::Challenge(args),
    };
    let mut transport = connect_transport(&cli, transport_provider)?;
    commands::run(command, &mut *transport)
}
