//! vrfmgrd - tenant VRF manager
//!
//! One-shot commands for managing tenant VRFs on the local host and for
//! working with the names and SRv6 endpoints derived from tenant ids.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fabric_common::{ProcSysctl, RtNetlink};
use fabric_identity::{
    decode_srv6_endpoint, encode_srv6_endpoint, interface_name, parse_segment_list, AttachmentId,
    Role, VpcId,
};
use fabric_vrfmgrd::{
    find_next_available_table_id, LoggingConfig, VrfMgr, VrfMgrConfig, DEFAULT_CONFIG_PATH,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "vrfmgrd", version, about = "Tenant VRF manager")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the VRF of a VPC attachment (hex ids)
    Add { vpc: VpcId, attachment: AttachmentId },
    /// Flush and remove the VRF of a VPC attachment (hex ids)
    Del {
        vpc: VpcId,
        attachment: AttachmentId,
        /// Succeed if the VRF does not exist
        #[arg(long)]
        ignore_missing: bool,
    },
    /// Delete every route in a routing table
    Flush { table_id: u32 },
    /// List VRFs as JSON
    List,
    /// Print the table id the next Add would use
    NextId,
    /// Print the interface name of a VPC attachment (hex ids)
    Name {
        vpc: VpcId,
        attachment: AttachmentId,
        #[arg(long, value_enum, default_value_t = RoleArg::Vrf)]
        role: RoleArg,
    },
    /// Encode an SRv6 endpoint from hex ids
    Encode {
        vpc: String,
        attachment: String,
        /// Site prefix, defaults to srv6.site_prefix from the config
        #[arg(long)]
        site_prefix: Option<String>,
    },
    /// Decode an SRv6 endpoint into hex ids
    Decode { endpoint: IpAddr },
    /// Print the segment list for an ordered list of hops
    Segments {
        #[arg(required = true)]
        hops: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Vrf,
    Host,
    Guest,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Vrf => Role::Vrf,
            RoleArg::Host => Role::Host,
            RoleArg::Guest => Role::Guest,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("vrfmgrd: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging);
    debug!(path = %cli.config.display(), "Loaded configuration");

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &Path) -> Result<VrfMgrConfig> {
    let config = VrfMgrConfig::load_or_default(path)?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn manager(config: &VrfMgrConfig) -> Result<VrfMgr<RtNetlink, ProcSysctl>> {
    let kernel = RtNetlink::new().context("Failed to open rtnetlink socket")?;
    let sysctl = ProcSysctl::with_root(&config.sysctl.root);
    Ok(VrfMgr::new(kernel, sysctl).with_sysctls(config.sysctl.enabled))
}

fn run(command: Command, config: &VrfMgrConfig) -> Result<()> {
    match command {
        Command::Add { vpc, attachment } => {
            let vrf = manager(config)?
                .add_ids(vpc, attachment)
                .with_context(|| format!("Failed to add VRF for {}/{}", vpc, attachment))?;
            println!("{}", serde_json::to_string(&vrf)?);
        }
        Command::Del {
            vpc,
            attachment,
            ignore_missing,
        } => match manager(config)?.delete_ids(vpc, attachment) {
            Ok(()) => {}
            Err(e) if ignore_missing && e.is_not_found() => debug!("{}", e),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to delete VRF for {}/{}", vpc, attachment))
            }
        },
        Command::Flush { table_id } => {
            manager(config)?
                .flush(table_id)
                .with_context(|| format!("Failed to flush table {}", table_id))?;
        }
        Command::List => {
            let vrfs = manager(config)?.list_vrfs()?;
            println!("{}", serde_json::to_string_pretty(&vrfs)?);
        }
        Command::NextId => {
            let kernel = RtNetlink::new().context("Failed to open rtnetlink socket")?;
            println!("{}", find_next_available_table_id(&kernel)?);
        }
        Command::Name {
            vpc,
            attachment,
            role,
        } => {
            println!("{}", interface_name(role.into(), vpc, attachment));
        }
        Command::Encode {
            vpc,
            attachment,
            site_prefix,
        } => {
            let Some(prefix) = site_prefix.or_else(|| config.srv6.site_prefix.clone()) else {
                bail!("No site prefix: pass --site-prefix or set srv6.site_prefix");
            };
            println!("{}", encode_srv6_endpoint(&prefix, &vpc, &attachment)?);
        }
        Command::Decode { endpoint } => {
            let (vpc, attachment) = decode_srv6_endpoint(endpoint)?;
            println!("{} {}", vpc, attachment);
        }
        Command::Segments { hops } => {
            for segment in parse_segment_list(&hops)? {
                println!("{}", segment);
            }
        }
    }
    Ok(())
}
