use arraymemo_config::ArrayMemoConfig;
use arraymemo_core::DataStore;
use arraymemo_utils::FileStore;
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;

pub mod lookup;
pub mod run;

#[derive(Subcommand)]
pub enum Commands {
    /// Run an array task, launching only sub-tasks missing from the catalog
    Run {
        /// Store root directory (overrides the configured root)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,

        /// Task template JSON file
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Prefix holding `<i>/inputs.json` for every sub-task
        #[arg(long, value_name = "PREFIX")]
        inputs: String,

        /// Prefix receiving `<i>/outputs.json` for every sub-task
        #[arg(long, value_name = "PREFIX")]
        outputs: String,

        /// Node execution id recorded with cached results
        #[arg(long, default_value = "local")]
        node_id: String,
    },

    /// Print the index lookup written for a run
    Lookup {
        /// Store root directory (overrides the configured root)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,

        /// Output prefix of the run
        #[arg(long, value_name = "PREFIX")]
        outputs: String,
    },
}

impl Commands {
    pub async fn execute(self, config: ArrayMemoConfig) -> eyre::Result<()> {
        match self {
            Commands::Run {
                store,
                template,
                inputs,
                outputs,
                node_id,
            } => {
                let store = open_store(store, &config)?;
                run::execute(&config, store, &template, inputs, outputs, node_id).await
            }
            Commands::Lookup { store, outputs } => {
                let store = open_store(store, &config)?;
                lookup::execute(&store, outputs).await
            }
        }
    }
}

/// File store at `flag`, falling back to the configured root
pub fn open_store(flag: Option<PathBuf>, config: &ArrayMemoConfig) -> eyre::Result<DataStore> {
    let root = flag.or_else(|| config.store.root.clone()).ok_or_else(|| {
        eyre::eyre!("no store root given; pass --store or set ARRAYMEMO_STORE_ROOT")
    })?;
    tracing::debug!(root = %root.display(), "Opening file store");
    Ok(DataStore::new(Arc::new(FileStore::new(root))))
}
