//! Extraction job planning
//!
//! Translates validated options plus the selected areas into the ordered job
//! list handed to the output engine:
//!
//! 1. CUE exports, one per area
//! 2. Raw image, split into `.NNN` volumes above `VOLUME_SECTOR_LIMIT`
//! 3. Edit masters, one per area, or per-track transcodes in ascending order
//!
//! Names derived from an area carry the `[stereo]`/`[multi]` qualifier when
//! more than one area is planned.

use crate::config::{ExtractionOptions, OutputMode};
use crate::disc::DiscStructure;
use crate::error::{ExtractError, Result};
use crate::naming::{self, NameResolver};
use crate::types::{
    AreaKind, ChannelArea, ExtractionJob, FrameFormat, PipelineId, TrackFormat, TrackJob,
};
use std::path::PathBuf;
use tracing::debug;

/// Largest raw image volume, in sectors (fits a 4 GiB FAT32 file)
pub const VOLUME_SECTOR_LIMIT: u32 = 2_090_000;

/// Everything the planner needs about one run
pub struct PlanRequest<'a> {
    pub options: &'a ExtractionOptions,
    pub disc: &'a dyn DiscStructure,
    pub areas: &'a [ChannelArea],
    pub album: &'a str,
    pub total_sectors: u32,
}

/// Ordered jobs plus the per-area track directories that were reserved
#[derive(Debug, Default)]
pub struct Plan {
    pub jobs: Vec<ExtractionJob>,
    pub track_dirs: Vec<(AreaKind, PathBuf)>,
}

impl Plan {
    /// Jobs routed to the output engine (everything except CUE exports)
    pub fn engine_jobs(&self) -> impl Iterator<Item = &ExtractionJob> {
        self.jobs
            .iter()
            .filter(|job| !matches!(job, ExtractionJob::CueExport { .. }))
    }

    pub fn cue_jobs(&self) -> impl Iterator<Item = &ExtractionJob> {
        self.jobs
            .iter()
            .filter(|job| matches!(job, ExtractionJob::CueExport { .. }))
    }
}

/// Build the job list for a run
pub fn plan(request: &PlanRequest<'_>, resolver: &NameResolver) -> Result<Plan> {
    let options = request.options;
    let needs_areas = options.export_cue
        || matches!(
            options.mode,
            Some(OutputMode::EditMaster | OutputMode::Tracks(_) | OutputMode::ImageAndTracks { .. })
        );

    if needs_areas && request.areas.is_empty() {
        return Err(ExtractError::config(
            "none of the requested channel areas are present on the disc",
        ));
    }

    let multiple_areas = request.areas.len() > 1;
    let mut plan = Plan::default();

    // edit master paths first, so each CUE sheet names the file actually written
    let masters: Vec<PathBuf> = if options.mode == Some(OutputMode::EditMaster) {
        request
            .areas
            .iter()
            .map(|area| {
                let base = naming::area_qualified(request.album, area.kind, multiple_areas);
                resolver.unique_path(&options.output_dir, &base, "dff")
            })
            .collect()
    } else {
        Vec::new()
    };

    if options.export_cue {
        for (i, area) in request.areas.iter().enumerate() {
            let base = naming::area_qualified(request.album, area.kind, multiple_areas);
            let path = resolver.unique_path(&options.output_dir, &base, "cue");
            plan.jobs.push(ExtractionJob::CueExport {
                area: area.kind,
                path,
                audio: masters.get(i).cloned(),
            });
        }
    }

    if options.wants_image() {
        plan_raw_image(request, resolver, &mut plan);
    }

    match options.mode {
        Some(OutputMode::EditMaster) => {
            for (area, path) in request.areas.iter().zip(masters) {
                plan.jobs.push(ExtractionJob::TrackTranscode(TrackJob {
                    area: area.kind,
                    track_index: 0,
                    path,
                    format: TrackFormat::DsdiffEditMaster,
                    decode_required: decode_required(TrackFormat::DsdiffEditMaster, area, options.convert_dst),
                    pad_required: false,
                    pipeline_id: PipelineId::Main,
                }));
            }
        }
        Some(OutputMode::Tracks(format)) | Some(OutputMode::ImageAndTracks { format, .. }) => {
            plan_tracks(request, resolver, format, multiple_areas, &mut plan)?;
        }
        Some(OutputMode::ImageOnly) | None => {}
    }

    debug!("Planned {} jobs", plan.jobs.len());
    Ok(plan)
}

fn plan_raw_image(request: &PlanRequest<'_>, resolver: &NameResolver, plan: &mut Plan) {
    let dir = &request.options.output_dir;

    if request.total_sectors <= VOLUME_SECTOR_LIMIT {
        plan.jobs.push(ExtractionJob::RawSectorRange {
            offset: 0,
            length: request.total_sectors,
            path: resolver.unique_path(dir, request.album, "iso"),
        });
        return;
    }

    let volumes = split_volumes(request.total_sectors, VOLUME_SECTOR_LIMIT);
    debug!("Splitting {} sectors into {} volumes", request.total_sectors, volumes.len());

    let paths = resolver.unique_volume_set(dir, request.album, "iso", volumes.len());
    for ((offset, length), path) in volumes.into_iter().zip(paths) {
        plan.jobs.push(ExtractionJob::RawSectorRange { offset, length, path });
    }
}

fn plan_tracks(
    request: &PlanRequest<'_>,
    resolver: &NameResolver,
    format: TrackFormat,
    multiple_areas: bool,
    plan: &mut Plan,
) -> Result<()> {
    let options = request.options;
    let pipeline_id = if options.is_concurrent() {
        PipelineId::DecodedTrack
    } else {
        PipelineId::Main
    };
    // padding assumes the whole album is extracted
    let pad_required = options.pad && format == TrackFormat::Dsf && options.tracks.is_empty();

    for area in request.areas {
        let base = naming::area_qualified(request.album, area.kind, multiple_areas);
        let dir = resolver.unique_directory(&options.track_output_dir, &base)?;
        let decode = decode_required(format, area, options.convert_dst);

        for index in options.tracks.tracks_for(area.track_count) {
            let track = request.disc.track(area.kind, index);
            let stem = naming::track_file_stem(index, track.as_ref());
            let path = resolver.unique_path(&dir, &stem, format.extension());

            plan.jobs.push(ExtractionJob::TrackTranscode(TrackJob {
                area: area.kind,
                track_index: index,
                path,
                format,
                decode_required: decode,
                pad_required,
                pipeline_id,
            }));
        }

        plan.track_dirs.push((area.kind, dir));
    }

    Ok(())
}

/// Whether the engine must emit plain DSD for this area
///
/// DSF cannot carry DST frames. DSDIFF keeps DST frames as they are unless
/// conversion was requested.
pub fn decode_required(format: TrackFormat, area: &ChannelArea, convert_dst: bool) -> bool {
    match format {
        TrackFormat::Dsf => true,
        TrackFormat::Dsdiff | TrackFormat::DsdiffEditMaster => {
            convert_dst || area.frame_format == FrameFormat::Uncompressed
        }
    }
}

/// Split `total` sectors into consecutive `(offset, length)` volumes of at most `limit`
pub fn split_volumes(total: u32, limit: u32) -> Vec<(u32, u32)> {
    let mut volumes = Vec::with_capacity((total / limit.max(1)) as usize + 1);
    let mut offset = 0;
    let mut remaining = total;
    while remaining > 0 {
        let length = remaining.min(limit);
        volumes.push((offset, length));
        offset += length;
        remaining -= length;
    }
    volumes
}
