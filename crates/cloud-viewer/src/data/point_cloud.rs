//! Loads a PLY point cloud and uploads it as one interleaved vertex
//! buffer.

use crate::data::types::{CloudGpu, CloudUniformStd140, PointVertex};
use crate::renderer::pipelines::points::POINT_SIZE_PX;
use crate::view::{Projection, ViewState};
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::path::Path;
use wgpu::util::DeviceExt;

/// Fallback color for clouds whose file carries no color attribute.
const DEFAULT_COLOR: [f32; 3] = [0.0, 0.0, 0.0];

/// Pairs each position with its color and packs them into the
/// interleaved `[x, y, z, r, g, b]` vertex layout. A color list that
/// does not pair 1:1 with the points is rejected here, before any GPU
/// upload.
pub fn interleave_attributes(cloud: &plypc::PlyCloud) -> Result<Vec<PointVertex>> {
    match cloud.colors.as_deref() {
        Some(colors) => {
            if colors.len() != cloud.points.len() {
                bail!(
                    "point/color count mismatch: {} points but {} colors",
                    cloud.points.len(),
                    colors.len()
                );
            }
            Ok(cloud
                .points
                .par_iter()
                .zip(colors.par_iter())
                .map(|(&position, &color)| PointVertex { position, color })
                .collect())
        }
        None => Ok(cloud
            .points
            .par_iter()
            .map(|&position| PointVertex {
                position,
                color: DEFAULT_COLOR,
            })
            .collect()),
    }
}

/// Axis-aligned bounding-box center of the cloud. The recentring
/// offset is derived from the actual geometry instead of assuming a
/// fixed cloud extent. Zero for an empty cloud.
pub fn bounding_center(vertices: &[PointVertex]) -> [f32; 3] {
    if vertices.is_empty() {
        return [0.0; 3];
    }

    use std::f32::{INFINITY, NEG_INFINITY};
    let (min, max) = vertices
        .par_iter()
        .map(|v| (v.position, v.position))
        .reduce(
            || ([INFINITY; 3], [NEG_INFINITY; 3]),
            |(a_min, a_max), (b_min, b_max)| {
                (
                    [
                        a_min[0].min(b_min[0]),
                        a_min[1].min(b_min[1]),
                        a_min[2].min(b_min[2]),
                    ],
                    [
                        a_max[0].max(b_max[0]),
                        a_max[1].max(b_max[1]),
                        a_max[2].max(b_max[2]),
                    ],
                )
            },
        );

    [
        (min[0] + max[0]) * 0.5,
        (min[1] + max[1]) * 0.5,
        (min[2] + max[2]) * 0.5,
    ]
}

/// Reads one PLY file from disk and uploads it to the GPU (interleaved
/// vertices + per-cloud UBO). A missing or unparsable file is fatal
/// and propagates to the caller.
pub fn load_cloud(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    path: &Path,
    view: &ViewState,
    projection: &Projection,
    viewport_size: [f32; 2],
) -> Result<CloudGpu> {
    let cloud = plypc::read_file(path)?;
    let vertices = interleave_attributes(&cloud)?;
    let center = bounding_center(&vertices);

    log::info!(
        "Loaded {}: {} points, colors={}",
        path.display(),
        vertices.len(),
        cloud.colors.is_some()
    );
    log::debug!(
        "Cloud center=({:.3},{:.3},{:.3})",
        center[0],
        center[1],
        center[2]
    );

    let vtx = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Cloud Vertices"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    });

    let mvp = projection.matrix * view.model_matrix(center.into());
    let ubo_data = CloudUniformStd140 {
        mvp: mvp.to_cols_array_2d(),
        viewport_size,
        point_size_px: POINT_SIZE_PX,
        _pad: 0.0,
    };

    let ubo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Cloud UBO"),
        contents: bytemuck::bytes_of(&ubo_data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Cloud BindGroup"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: ubo.as_entire_binding(),
        }],
    });

    Ok(CloudGpu {
        point_count: vertices.len() as u32,
        center,
        vtx,
        ubo,
        bind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plypc::PlyCloud;

    fn reference_cloud() -> PlyCloud {
        PlyCloud {
            points: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            colors: Some(vec![
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
            ]),
        }
    }

    #[test]
    fn interleaves_reference_cloud_exactly() {
        let vertices = interleave_attributes(&reference_cloud()).unwrap();
        assert_eq!(vertices.len(), 4);

        // The flat f32 view is the attribute buffer the renderer
        // uploads: [x,y,z,r,g,b] per point, length 6N.
        let flat: &[f32] = bytemuck::cast_slice(&vertices);
        assert_eq!(
            flat,
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
            ]
        );
        assert_eq!(flat.len(), 6 * vertices.len());
    }

    #[test]
    fn round_trips_positions_and_colors() {
        let cloud = reference_cloud();
        let vertices = interleave_attributes(&cloud).unwrap();
        for (i, v) in vertices.iter().enumerate() {
            assert_eq!(v.position, cloud.points[i]);
            assert_eq!(v.color, cloud.colors.as_ref().unwrap()[i]);
        }
    }

    #[test]
    fn empty_cloud_yields_empty_buffer() {
        let vertices = interleave_attributes(&PlyCloud::default()).unwrap();
        assert!(vertices.is_empty());
        assert_eq!(bounding_center(&vertices), [0.0; 3]);
    }

    #[test]
    fn missing_colors_default_to_black() {
        let cloud = PlyCloud {
            points: vec![[1.0, 2.0, 3.0]],
            colors: None,
        };
        let vertices = interleave_attributes(&cloud).unwrap();
        assert_eq!(vertices[0].color, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn count_mismatch_is_fatal() {
        let cloud = PlyCloud {
            points: vec![[0.0; 3], [1.0; 3]],
            colors: Some(vec![[1.0; 3]]),
        };
        assert!(interleave_attributes(&cloud).is_err());
    }

    #[test]
    fn bounding_center_follows_geometry() {
        let cloud = PlyCloud {
            points: vec![[10.0, -4.0, 2.0], [20.0, 4.0, 8.0], [12.0, 0.0, 5.0]],
            colors: None,
        };
        let vertices = interleave_attributes(&cloud).unwrap();
        assert_eq!(bounding_center(&vertices), [15.0, 0.0, 5.0]);
    }
}
