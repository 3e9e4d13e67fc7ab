use cfcopy_core::ObjectLocation;
use eyre::{Context, Result};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::cli::{GetArgs, PutArgs, StatArgs};
use crate::context::AppContext;

#[derive(Serialize)]
struct StatOutput<'a> {
    location: String,
    size: u64,
    etag: &'a str,
}

pub async fn run_stat(ctx: &AppContext, args: &StatArgs) -> Result<()> {
    let target = ObjectLocation::parse(&args.target)?;
    let store = ctx.store()?;
    let session = store.authorize().await?;
    let stat = store.stat(&session, target.as_path()).await?;

    if args.json {
        let output = StatOutput {
            location: target.to_string(),
            size: stat.size,
            etag: &stat.hash,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{target}");
        println!("  size: {} bytes", stat.size);
        println!("  etag: {}", stat.hash);
    }
    Ok(())
}

pub async fn run_get(ctx: &AppContext, args: &GetArgs) -> Result<()> {
    let source = ObjectLocation::parse(&args.source)?;
    let store = ctx.store()?;
    let session = store.authorize().await?;

    let mut file = File::create(&args.output)
        .await
        .wrap_err_with(|| format!("creating {}", args.output.display()))?;
    let outcome = store
        .ranged_read(
            &session,
            source.as_path(),
            args.offset,
            args.length,
            &mut file,
        )
        .await?;
    file.flush()
        .await
        .wrap_err_with(|| format!("flushing {}", args.output.display()))?;

    println!(
        "Downloaded {} bytes from {} to {} (etag {})",
        outcome.bytes,
        source,
        args.output.display(),
        outcome.hash
    );
    Ok(())
}

pub async fn run_put(ctx: &AppContext, args: &PutArgs) -> Result<()> {
    let dest = ObjectLocation::parse(&args.destination)?;
    let file = File::open(&args.file)
        .await
        .wrap_err_with(|| format!("opening {}", args.file.display()))?;
    let length = file
        .metadata()
        .await
        .wrap_err_with(|| format!("reading metadata for {}", args.file.display()))?
        .len();

    let store = ctx.store()?;
    let session = store.authorize().await?;
    let etag = store
        .write(&session, dest.as_path(), Box::new(file), length)
        .await?;

    println!(
        "Uploaded {} ({} bytes) to {} (etag {})",
        args.file.display(),
        length,
        dest,
        etag
    );
    Ok(())
}
