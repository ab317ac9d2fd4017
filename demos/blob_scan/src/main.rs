use argh::FromArgs;
use tgv::{
    blob::{BlobScanner, Connectivity, ScanConfig, ThresholdMode},
    imgproc::parallel::ExecutionStrategy,
    io::png::{read_image_png_rgba8, write_luminance_png},
};

/// Scans a PNG frame into foreground and background blobs
#[derive(Debug, FromArgs)]
struct Args {
    /// image path
    #[argh(positional)]
    path: String,

    /// dilation radius in pixels
    #[argh(option, short = 'd', default = "1")]
    dilate_radius: usize,

    /// box blur radius in pixels
    #[argh(option, short = 'b', default = "1")]
    blur_radius: usize,

    /// fixed luminance threshold (0..=765), Otsu when omitted
    #[argh(option, short = 't')]
    threshold: Option<u16>,

    /// connect diagonally touching foreground runs
    #[argh(switch, short = 'e')]
    eight: bool,

    /// run every stage on the calling thread
    #[argh(switch)]
    serial: bool,

    /// also list background blobs
    #[argh(switch, short = 'a')]
    all: bool,

    /// minimum bounding box area of the listed blobs
    #[argh(option, short = 'm', default = "0")]
    min_area: usize,

    /// print the blobs as JSON
    #[argh(switch, short = 'j')]
    json: bool,

    /// write the filtered luminance to this PNG file
    #[argh(option)]
    dump: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let frame = read_image_png_rgba8(&args.path)?;
    log::info!("read {} ({})", args.path, frame.size());

    let config = ScanConfig {
        dilate_radius: args.dilate_radius,
        blur_radius: args.blur_radius,
        threshold: args
            .threshold
            .map_or(ThresholdMode::Otsu, ThresholdMode::Fixed),
        connectivity: if args.eight {
            Connectivity::Eight
        } else {
            Connectivity::Four
        },
        strategy: if args.serial {
            ExecutionStrategy::Serial
        } else {
            ExecutionStrategy::ParallelRows
        },
    };

    let mut scanner = BlobScanner::new(config, frame.size())?;
    let result = scanner.scan(&frame)?;

    if let Some(dump) = &args.dump {
        write_luminance_png(dump, scanner.filtered())?;
    }

    let blobs: Vec<_> = result
        .blobs
        .iter()
        .filter(|b| args.all || b.is_foreground())
        .filter(|b| b.area_bbox() >= args.min_area)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&blobs)?);
        return Ok(());
    }

    println!(
        "threshold: {}, runs: {}, blobs: {} ({} foreground)",
        result.runs.threshold(),
        result.runs.len(),
        result.blobs.len(),
        result.blobs.foreground().count()
    );
    for blob in blobs {
        println!(
            "{:?} x: {}..={} y: {}..={} runs: {} slopes: {}",
            blob.class,
            blob.min_x,
            blob.max_x,
            blob.min_y,
            blob.max_y,
            blob.run_count,
            blob.slope_count
        );
    }

    Ok(())
}
