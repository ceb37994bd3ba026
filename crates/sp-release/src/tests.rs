//! Unit tests for sp-release.

#[cfg(test)]
mod helpers {
    use sp_core::{ReleaseRng, SimTime};
    use sp_elements::ElementData;
    use sp_geometry::{Coord, MultiPolygon, Polygon};

    use crate::Release;

    pub fn t0() -> SimTime {
        SimTime::from_civil(2024, 1, 1, 0, 0, 0).unwrap()
    }

    pub fn rect(min: Coord, max: Coord) -> MultiPolygon {
        MultiPolygon::from(Polygon::rectangle(min, max))
    }

    /// Step `release` the way the driver does and return the storage.
    pub fn run(release: &mut dyn Release, ts: u32, steps: usize, seed: u64) -> ElementData {
        release.prepare_for_model_run(ts).unwrap();
        let mut data = ElementData::new();
        let mut rng = ReleaseRng::new(seed);
        let mut released = 0;
        for k in 0..steps {
            let t = release.release_time() + (k as i64) * ts as i64;
            let n = release.num_elements_to_release(t, ts, released);
            if n == 0 {
                continue;
            }
            data.append(n);
            release.initialize_elements(n, &mut data, t, ts, &mut rng).unwrap();
            released += n;
        }
        data
    }

    /// Little-endian polygon `.shp`; rings are written as given.
    pub fn shp_bytes(records: &[Vec<Coord>]) -> Vec<u8> {
        let mut body = Vec::new();
        for (i, ring) in records.iter().enumerate() {
            let mut content = Vec::new();
            content.extend_from_slice(&5_i32.to_le_bytes());
            content.extend_from_slice(&[0u8; 32]);
            content.extend_from_slice(&1_i32.to_le_bytes());
            content.extend_from_slice(&(ring.len() as i32).to_le_bytes());
            content.extend_from_slice(&0_i32.to_le_bytes());
            for c in ring {
                content.extend_from_slice(&c[0].to_le_bytes());
                content.extend_from_slice(&c[1].to_le_bytes());
            }
            body.extend_from_slice(&(i as i32 + 1).to_be_bytes());
            body.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
            body.extend_from_slice(&content);
        }
        let mut out = Vec::new();
        out.extend_from_slice(&9994_i32.to_be_bytes());
        out.extend_from_slice(&[0u8; 20]);
        out.extend_from_slice(&(((100 + body.len()) / 2) as i32).to_be_bytes());
        out.extend_from_slice(&1000_i32.to_le_bytes());
        out.extend_from_slice(&5_i32.to_le_bytes());
        out.extend_from_slice(&[0u8; 64]);
        out.extend_from_slice(&body);
        out
    }

    /// dBASE table of character fields, each `width` bytes wide.
    pub fn dbf_bytes(fields: &[&str], width: u8, rows: &[Vec<&str>]) -> Vec<u8> {
        let header_len = 32 + 32 * fields.len() + 1;
        let record_len = 1 + fields.len() * width as usize;
        let mut out = vec![0x03, 124, 1, 1];
        out.extend_from_slice(&(rows.len() as u32).to_le_bytes());
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
        out.extend_from_slice(&(record_len as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 20]);
        for name in fields {
            let mut d = [0u8; 32];
            d[..name.len()].copy_from_slice(name.as_bytes());
            d[11] = b'C';
            d[16] = width;
            out.extend_from_slice(&d);
        }
        out.push(0x0D);
        for row in rows {
            out.push(b' ');
            for v in row {
                let mut cell = v.as_bytes().to_vec();
                cell.resize(width as usize, b' ');
                out.extend_from_slice(&cell);
            }
        }
        out.push(0x1A);
        out
    }

    /// Clockwise Web Mercator square, closed.
    pub fn mercator_square(x0: f64, y0: f64, side: f64) -> Vec<Coord> {
        vec![
            [x0, y0],
            [x0, y0 + side],
            [x0 + side, y0 + side],
            [x0 + side, y0],
            [x0, y0],
        ]
    }
}

// ── Timeseries ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod timeseries {
    use super::helpers::t0;
    use crate::ReleaseTimeseries;

    #[test]
    fn interpolates_and_clamps() {
        let ts = ReleaseTimeseries::new(vec![t0(), t0() + 100], vec![0.0, 10.0]).unwrap();
        assert_eq!(ts.at(t0() - 50), 0.0);
        assert_eq!(ts.at(t0() + 50), 5.0);
        assert_eq!(ts.at(t0() + 500), 10.0);
    }

    #[test]
    fn rejects_unordered_times() {
        assert!(ReleaseTimeseries::new(vec![t0(), t0()], vec![0.0, 1.0]).is_none());
        assert!(ReleaseTimeseries::new(vec![t0()], vec![0.0, 1.0]).is_none());
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod schedule {
    use super::helpers::t0;
    use crate::{ElementCount, Release, ReleaseError, ReleaseSchedule, ReleaseScheduler, ScheduleBuilder};

    #[test]
    fn hour_long_release_in_half_hour_steps() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 3_600)
            .num_elements(10)
            .build()
            .unwrap();
        let mut release = ReleaseScheduler::new(schedule);
        assert_eq!(release.num_release_time_steps(1_800), 2);
        assert_eq!(release.le_timestep_ratio(1_800), 5.0);

        release.prepare_for_model_run(1_800).unwrap();
        assert_eq!(release.num_elements_after_time(t0(), 0), 0);
        assert_eq!(release.num_elements_after_time(t0(), 1_800), 5);
        assert_eq!(release.num_elements_after_time(t0(), 3_600), 10);
    }

    #[test]
    fn instantaneous_release_is_all_at_once() {
        let mut release = ReleaseScheduler::new(ReleaseSchedule::instantaneous(t0(), 50));
        release.prepare_for_model_run(900).unwrap();
        assert_eq!(release.num_elements_after_time(t0() - 1, 0), 0);
        assert_eq!(release.num_elements_after_time(t0() - 900, 899), 0);
        assert_eq!(release.num_elements_after_time(t0(), 0), 50);
        assert_eq!(release.num_elements_after_time(t0() + 7_200, 900), 50);
    }

    #[test]
    fn cumulative_counts_are_monotone() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 10_000)
            .num_elements(997)
            .build()
            .unwrap();
        let prepared = schedule.prepare(900).unwrap();
        let values = prepared.counts().values();
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&997.0));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(prepared.counts().times().last(), Some(&(t0() + 10_000)));
        assert_eq!(prepared.num_elements_after_time(t0(), 10_000), 997);
    }

    #[test]
    fn per_timestep_rate() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 3_600)
            .num_per_timestep(20)
            .release_mass(100.0)
            .build()
            .unwrap();
        assert_eq!(schedule.count(), ElementCount::PerTimestep(20));
        assert_eq!(schedule.max_release(600), 120);
        let prepared = schedule.prepare(600).unwrap();
        assert!((prepared.mass_per_element() - 100.0 / 120.0).abs() < 1e-12);
    }

    #[test]
    fn both_counts_is_configuration_error() {
        let err = ScheduleBuilder::new(t0())
            .num_elements(10)
            .num_per_timestep(2)
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn end_before_start_is_validation_error() {
        let err = ScheduleBuilder::new(t0())
            .end_release_time(t0() - 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Validation(_)));
    }

    #[test]
    fn missing_release_time_is_configuration_error() {
        let err = ScheduleBuilder::default().num_elements(5).build().unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn too_few_elements_for_steps() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 3_600)
            .num_elements(1)
            .build()
            .unwrap();
        let err = schedule.prepare(1_800).unwrap_err();
        assert!(matches!(err, ReleaseError::InsufficientElements { steps: 2, .. }));
    }

    #[test]
    fn zero_timestep_rejected() {
        let err = ReleaseSchedule::instantaneous(t0(), 1).prepare(0).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn negative_mass_is_clamped() {
        let schedule = ScheduleBuilder::new(t0()).release_mass(-5.0).build().unwrap();
        assert_eq!(schedule.release_mass(), 0.0);
    }

    #[test]
    fn defaults_to_a_thousand_elements() {
        let schedule = ScheduleBuilder::new(t0()).build().unwrap();
        assert_eq!(schedule.num_elements(), Some(crate::schedule::DEFAULT_NUM_ELEMENTS));
        assert!(schedule.is_instantaneous());
    }
}

// ── ReleaseScheduler ──────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use sp_core::{ReleaseRng, WorldPoint};
    use sp_elements::ElementData;

    use super::helpers::{run, t0};
    use crate::{Release, ReleaseError, ReleaseScheduler, ScheduleBuilder};

    #[test]
    fn tiles_custom_positions() {
        let positions = vec![
            WorldPoint::surface(1.0, 1.0),
            WorldPoint::surface(2.0, 2.0),
            WorldPoint::surface(3.0, 3.0),
        ];
        let schedule = ScheduleBuilder::new(t0()).num_elements(7).build().unwrap();
        let mut release = ReleaseScheduler::with_custom_positions(schedule, positions.clone());
        let data = run(&mut release, 900, 1, 3);

        assert_eq!(data.len(), 7);
        for (i, p) in data.positions()[..6].iter().enumerate() {
            assert_eq!(*p, positions[i % 3]);
        }
        assert!(positions.contains(&data.positions()[6]));
    }

    #[test]
    fn mass_is_conserved_over_a_time_varying_release() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 6 * 3_600)
            .num_elements(101)
            .release_mass(2_500.0)
            .build()
            .unwrap();
        let mut release =
            ReleaseScheduler::with_custom_positions(schedule, vec![WorldPoint::surface(-70.0, 41.0)]);
        let data = run(&mut release, 900, 30, 0);
        assert_eq!(data.len(), 101);
        assert!((data.total_mass() - 2_500.0).abs() < 1e-9);
        assert_eq!(data.mass(), data.init_mass());
    }

    #[test]
    fn no_positions_is_configuration_error() {
        let schedule = ScheduleBuilder::new(t0()).num_elements(2).build().unwrap();
        let mut release = ReleaseScheduler::new(schedule);
        release.prepare_for_model_run(900).unwrap();
        let mut data = ElementData::new();
        data.append(2);
        let err = release
            .initialize_elements(2, &mut data, t0(), 900, &mut ReleaseRng::new(0))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn batch_larger_than_storage_is_consistency_error() {
        let schedule = ScheduleBuilder::new(t0()).num_elements(5).build().unwrap();
        let mut release =
            ReleaseScheduler::with_custom_positions(schedule, vec![WorldPoint::ORIGIN]);
        release.prepare_for_model_run(900).unwrap();
        let mut data = ElementData::new();
        data.append(2);
        let err = release
            .initialize_elements(5, &mut data, t0(), 900, &mut ReleaseRng::new(0))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Consistency(_)));
    }

    #[test]
    fn rewind_drops_prepared_state() {
        let schedule = ScheduleBuilder::new(t0()).num_elements(5).build().unwrap();
        let mut release = ReleaseScheduler::new(schedule);
        release.prepare_for_model_run(60).unwrap();
        assert_eq!(release.max_release(), Some(5));
        release.rewind();
        release.rewind();
        assert!(!release.is_prepared());
        assert_eq!(release.num_elements_after_time(t0(), 60), 0);
    }
}

// ── PointLineRelease ──────────────────────────────────────────────────────────

#[cfg(test)]
mod point_line {
    use sp_core::WorldPoint;

    use super::helpers::{run, t0};
    use crate::{PointLineRelease, Release, ScheduleBuilder};

    #[test]
    fn instantaneous_line_lies_on_segment() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0())
            .num_elements(4)
            .build()
            .unwrap();
        let mut release =
            PointLineRelease::line(schedule, WorldPoint::ORIGIN, WorldPoint::new(1.0, 1.0, 0.0));
        assert!(!release.is_pointsource());

        let data = run(&mut release, 900, 1, 0);
        assert_eq!(data.len(), 4);
        for p in data.positions() {
            assert!((p.lon - p.lat).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&p.lon));
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn point_source_stays_put() {
        let here = WorldPoint::new(-70.5, 41.5, 2.0);
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 7_200)
            .num_elements(40)
            .release_mass(10.0)
            .build()
            .unwrap();
        let mut release = PointLineRelease::point(schedule, here);
        assert!(release.is_pointsource());

        let data = run(&mut release, 900, 10, 0);
        assert_eq!(data.len(), 40);
        assert!(data.positions().iter().all(|p| *p == here));
        assert!((data.total_mass() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn moving_source_tracks_the_line() {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 3_600)
            .num_elements(100)
            .build()
            .unwrap();
        let mut release = PointLineRelease::line(
            schedule,
            WorldPoint::surface(0.0, 0.0),
            WorldPoint::surface(2.0, 0.0),
        );
        release.prepare_for_model_run(900).unwrap();
        let mid = release.position_at(t0() + 1_800).unwrap();
        assert!((mid.lon - 1.0).abs() < 1e-12);
        assert_eq!(release.position_at(t0() + 99_999).unwrap().lon, 2.0);
    }
}

// ── SpatialRelease ────────────────────────────────────────────────────────────

#[cfg(test)]
mod spatial {
    use sp_core::ReleaseRng;
    use sp_elements::ElementData;
    use sp_geometry::{Feature, FeatureCollection};

    use super::helpers::{rect, run, t0};
    use crate::spatial::{THICKNESS, WEIGHT};
    use crate::{Release, ReleaseError, ReleaseSchedule, ScheduleBuilder, SpatialRelease};

    #[test]
    fn unit_square_samples_stay_inside() {
        let mut release = SpatialRelease::builder(ScheduleBuilder::new(t0()).num_elements(1_000))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0])])
            .build()
            .unwrap();
        let data = run(&mut release, 900, 1, 42);

        assert_eq!(data.len(), 1_000);
        assert!(data.positions().iter().all(|p| {
            (0.0..=1.0).contains(&p.lon) && (0.0..=1.0).contains(&p.lat) && p.z == 0.0
        }));
        let left = data.positions().iter().filter(|p| p.lon < 0.5).count();
        assert!((400..=600).contains(&left), "left half got {left}");
    }

    #[test]
    fn metre_scale_polygon_releases() {
        let (min, max) = ([-122.0, 47.0], [-121.9999, 47.0001]);
        let mut release = SpatialRelease::builder(ScheduleBuilder::new(t0()).num_elements(50))
            .polygons(vec![rect(min, max)])
            .build()
            .unwrap();
        let data = run(&mut release, 900, 1, 3);

        assert_eq!(data.len(), 50);
        let sum: f64 = release.triangle_weights().unwrap().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(data.positions().iter().all(|p| {
            (min[0]..=max[0]).contains(&p.lon) && (min[1]..=max[1]).contains(&p.lat)
        }));
    }

    #[test]
    fn triangle_weights_sum_to_one() {
        let mut release = SpatialRelease::builder(ScheduleBuilder::new(t0()).num_elements(10))
            .polygons(vec![
                rect([0.0, 0.0], [1.0, 1.0]),
                rect([5.0, 5.0], [7.0, 6.0]),
                rect([-3.0, -3.0], [-2.5, -1.0]),
            ])
            .weights(vec![0.2, 0.3, 0.5])
            .build()
            .unwrap();
        release.prepare_for_model_run(60).unwrap();
        let sum: f64 = release.triangle_weights().unwrap().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn thickness_ratio_sets_weight_ratio() {
        let mut release = SpatialRelease::builder(ScheduleBuilder::new(t0()).num_elements(10))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0]), rect([1.0, 0.0], [2.0, 1.0])])
            .thicknesses(vec![2.0, 1.0])
            .build()
            .unwrap();
        release.prepare_for_model_run(60).unwrap();

        let triangles = release.triangles().unwrap();
        let weights = release.triangle_weights().unwrap();
        let left: f64 = triangles
            .iter()
            .zip(weights)
            .filter(|(t, _)| t.vertices().iter().all(|v| v[0] <= 1.0))
            .map(|(_, w)| w)
            .sum();
        let right = 1.0 - left;
        assert!((left / right - 2.0).abs() < 1e-6, "ratio {}", left / right);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = SpatialRelease::builder(ScheduleBuilder::new(t0()))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0]), rect([2.0, 2.0], [3.0, 3.0])])
            .weights(vec![0.2, 0.2])
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Validation(_)));
    }

    #[test]
    fn weights_and_thicknesses_are_exclusive() {
        let err = SpatialRelease::builder(ScheduleBuilder::new(t0()))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0])])
            .weights(vec![1.0])
            .thicknesses(vec![1.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn conflicting_sources_rejected() {
        let fc: FeatureCollection = [Feature::from_multipolygon(&rect([0.0, 0.0], [1.0, 1.0]))]
            .into_iter()
            .collect();
        let err = SpatialRelease::builder(ScheduleBuilder::new(t0()))
            .features(fc)
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0])])
            .build()
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));

        let err = SpatialRelease::builder(ScheduleBuilder::new(t0())).build().unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn projected_coordinates_fail_validation() {
        let mut release = SpatialRelease::builder(ScheduleBuilder::new(t0()).num_elements(10))
            .polygons(vec![rect([0.0, 0.0], [50_000.0, 50_000.0])])
            .build()
            .unwrap();
        let err = release.prepare_for_model_run(60).unwrap_err();
        assert!(matches!(err, ReleaseError::Validation(_)));
    }

    #[test]
    fn geojson_keeps_weights() {
        let release = SpatialRelease::builder(ScheduleBuilder::new(t0()))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0]), rect([2.0, 0.0], [3.0, 1.0])])
            .weights(vec![0.25, 0.75])
            .build()
            .unwrap();
        let text = release.to_geojson_string().unwrap();
        assert!(text.contains("\"FeatureCollection\""));

        let reloaded =
            SpatialRelease::from_geojson_str(ReleaseSchedule::instantaneous(t0(), 10), &text).unwrap();
        assert_eq!(reloaded.weights(), Some(vec![0.25, 0.75]));
        assert_eq!(reloaded.thicknesses(), None);
        assert_eq!(reloaded.polygons().unwrap(), release.polygons().unwrap());
    }

    #[test]
    fn partial_thickness_is_rejected() {
        let fc: FeatureCollection = [
            Feature::from_multipolygon(&rect([0.0, 0.0], [1.0, 1.0])).with_property(THICKNESS, 1.0),
            Feature::from_multipolygon(&rect([2.0, 0.0], [3.0, 1.0])).with_property(WEIGHT, 1.0),
        ]
        .into_iter()
        .collect();
        let mut release = SpatialRelease::new(ReleaseSchedule::instantaneous(t0(), 10), fc).unwrap();
        let err = release.prepare_for_model_run(60).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn get_polygons_lists_closed_exteriors() {
        let release = SpatialRelease::builder(ScheduleBuilder::new(t0()))
            .polygons(vec![rect([0.0, 0.0], [1.0, 1.0])])
            .build()
            .unwrap();
        let (lengths, rings) = release.get_polygons().unwrap();
        assert_eq!(lengths, vec![5]);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn mass_split_evenly() {
        let mut release = SpatialRelease::builder(
            ScheduleBuilder::new(t0()).num_elements(200).release_mass(400.0),
        )
        .polygons(vec![rect([10.0, 10.0], [11.0, 12.0])])
        .build()
        .unwrap();
        release.prepare_for_model_run(600).unwrap();
        let mut data = ElementData::new();
        data.append(200);
        release
            .initialize_elements(200, &mut data, t0(), 600, &mut ReleaseRng::new(9))
            .unwrap();
        assert!(data.mass().iter().all(|&m| m == 2.0));
        assert!((data.total_mass() - 400.0).abs() < 1e-9);
    }
}

// ── NesdisRelease ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod nesdis {
    use sp_core::SimTime;
    use sp_geometry::FeatureCollection;

    use super::helpers::{dbf_bytes, mercator_square, rect, run, shp_bytes, t0};
    use crate::nesdis::{RELEASE_TIME, THICK_OIL_THICKNESS_M, THIN_OIL_THICKNESS_M, parse_capture_time};
    use crate::{NesdisRelease, Release, ReleaseError, ScheduleBuilder, SpatialReleaseBuilder, load_nesdis};

    fn write_fixture(dir: &std::path::Path) -> std::path::PathBuf {
        let shp = shp_bytes(&[
            mercator_square(-8_000_000.0, 4_000_000.0, 100_000.0),
            mercator_square(-7_800_000.0, 4_000_000.0, 100_000.0),
        ]);
        let dbf = dbf_bytes(
            &["OILTYPE", "DATE", "TIME"],
            10,
            &[
                vec!["Thin", "06/05/2020", "14:30 CDT"],
                vec!["Thick", "06/05/2020", "1430"],
            ],
        );
        let path = dir.join("analysis.shp");
        std::fs::write(&path, shp).unwrap();
        std::fs::write(dir.join("analysis.dbf"), dbf).unwrap();
        path
    }

    #[test]
    fn capture_time_formats() {
        let expected = SimTime::from_civil(2020, 6, 5, 14, 30, 0).unwrap();
        assert_eq!(parse_capture_time("06/05/2020", "1430"), Some(expected));
        assert_eq!(parse_capture_time("6/5/2020", "14:30 CDT"), Some(expected));
        assert_eq!(
            parse_capture_time("06/05/2020", "930"),
            Some(SimTime::from_civil(2020, 6, 5, 9, 30, 0).unwrap())
        );
        assert_eq!(parse_capture_time("2020-06-05", "1430"), None);
        assert_eq!(parse_capture_time("06/05/2020", "14"), None);
    }

    #[test]
    fn ingestion_reprojects_and_classifies() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_nesdis(write_fixture(dir.path())).unwrap();
        assert_eq!(fc.len(), 2);

        for mp in fc.multipolygons().unwrap() {
            mp.validate_geographic().unwrap();
            assert!(mp.coords().all(|c| c[0] < -69.0 && c[0] > -73.0));
        }
        let thick: Vec<f64> = fc.iter().map(|f| f.property_f64("thickness").unwrap()).collect();
        assert_eq!(thick, vec![THIN_OIL_THICKNESS_M, THICK_OIL_THICKNESS_M]);
        assert_eq!(
            fc.features[0].property_str(RELEASE_TIME),
            Some("2020-06-05T14:30:00")
        );
    }

    #[test]
    fn release_time_comes_from_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());
        let mut release =
            NesdisRelease::load(&path, ScheduleBuilder::default().num_elements(500)).unwrap();
        assert_eq!(
            release.release_time(),
            SimTime::from_civil(2020, 6, 5, 14, 30, 0).unwrap()
        );
        assert_eq!(release.oil_types(), vec!["Thin", "Thick"]);
        let meta = release.metadata();
        assert_eq!(meta.weights, None);
        assert_eq!(meta.thicknesses.map(|t| t.len()), Some(2));

        let areas = release.record_areas().unwrap();
        assert!(areas.iter().all(|&a| a > 0.0));

        let data = run(&mut release, 900, 1, 5);
        assert_eq!(data.len(), 500);
        assert!(data.positions().iter().all(|p| p.is_geographic()));
        // 40:1 thickness ratio puts nearly everything in the thick polygon.
        let boundary = -7_800_000.0_f64 / 6_378_137.0 * 180.0 / std::f64::consts::PI;
        let thin = data.positions().iter().filter(|p| p.lon < boundary).count();
        assert!(thin < 50, "thin polygon got {thin}");
    }

    #[test]
    fn file_and_features_conflict() {
        let fc: FeatureCollection =
            [sp_geometry::Feature::from_multipolygon(&rect([0.0, 0.0], [1.0, 1.0]))]
                .into_iter()
                .collect();
        let builder = SpatialReleaseBuilder::new(ScheduleBuilder::new(t0()))
            .shapefile("missing.zip")
            .features(fc);
        let err = NesdisRelease::from_builder(builder).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn falls_back_to_given_release_time() {
        let fc: FeatureCollection = [sp_geometry::Feature::from_multipolygon(&rect(
            [0.0, 0.0],
            [1.0, 1.0],
        ))
        .with_property("thickness", THIN_OIL_THICKNESS_M)]
        .into_iter()
        .collect();
        let builder = SpatialReleaseBuilder::new(ScheduleBuilder::new(t0())).features(fc.clone());
        let release = NesdisRelease::from_builder(builder).unwrap();
        assert_eq!(release.release_time(), t0());

        let builder = SpatialReleaseBuilder::new(ScheduleBuilder::default()).features(fc);
        let err = NesdisRelease::from_builder(builder).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }
}

// ── PlumeRelease ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod plume {
    use sp_core::{ReleaseRng, WorldPoint};
    use sp_elements::ElementData;

    use super::helpers::{run, t0};
    use crate::{PlumeGenerator, PlumeRelease, Release, ReleaseError, ScheduleBuilder};

    fn release() -> PlumeRelease {
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 3_600)
            .num_elements(100)
            .release_mass(50.0)
            .build()
            .unwrap();
        PlumeRelease::vertical(
            schedule,
            WorldPoint::surface(-88.0, 28.0),
            &[(1_000.0, 0.5), (800.0, 0.3), (600.0, 0.2)],
        )
        .unwrap()
    }

    #[test]
    fn bins_apportion_the_total() {
        let plume = release();
        assert_eq!(plume.generator().bin_totals(), &[50, 30, 20]);
        assert_eq!(plume.generator().total_elements(), 100);
    }

    #[test]
    fn windows_sum_to_total() {
        let mut plume = release();
        let data = run(&mut plume, 600, 8, 0);
        assert_eq!(data.len(), 100);
        assert!((data.total_mass() - 50.0).abs() < 1e-9);
        let deep = data.positions().iter().filter(|p| p.z == 1_000.0).count();
        assert_eq!(deep, 50);
    }

    #[test]
    fn instantaneous_plume_releases_in_first_step() {
        let schedule = ScheduleBuilder::new(t0())
            .num_elements(100)
            .release_mass(50.0)
            .build()
            .unwrap();
        let mut plume = PlumeRelease::vertical(
            schedule,
            WorldPoint::surface(-88.0, 28.0),
            &[(1_000.0, 0.5), (500.0, 0.5)],
        )
        .unwrap();

        plume.prepare_for_model_run(900).unwrap();
        assert_eq!(plume.num_elements_to_release(t0(), 900, 0), 100);
        assert_eq!(plume.num_elements_to_release(t0() + 900, 900, 100), 0);
        assert_eq!(plume.num_elements_to_release(t0() - 900, 900, 0), 0);

        let data = run(&mut plume, 900, 4, 0);
        assert_eq!(data.len(), 100);
        assert!((data.total_mass() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn count_mismatch_is_consistency_error() {
        let mut plume = release();
        plume.prepare_for_model_run(600).unwrap();
        let n = plume.num_elements_to_release(t0(), 600, 0);
        assert!(n > 0);

        let mut data = ElementData::new();
        data.append(n + 1);
        let err = plume
            .initialize_elements(n + 1, &mut data, t0(), 600, &mut ReleaseRng::new(0))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Consistency(_)));
    }

    #[test]
    fn rate_schedule_rejected() {
        let schedule = ScheduleBuilder::new(t0()).num_per_timestep(3).build().unwrap();
        let err = PlumeRelease::vertical(schedule, WorldPoint::ORIGIN, &[(10.0, 1.0)]).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }
}

// ── ContinuousPointsRelease ───────────────────────────────────────────────────

#[cfg(test)]
mod continuous {
    use sp_core::WorldPoint;

    use super::helpers::{run, t0};
    use crate::{ContinuousPointsRelease, ReleaseError, ReleaseSchedule, ScheduleBuilder};

    #[test]
    fn rotation_continues_across_steps() {
        let points: Vec<WorldPoint> = (0..4).map(|i| WorldPoint::surface(i as f64, 0.0)).collect();
        let schedule = ScheduleBuilder::new(t0())
            .end_release_time(t0() + 2_700)
            .num_elements(10)
            .build()
            .unwrap();
        let mut release = ContinuousPointsRelease::new(schedule, points.clone()).unwrap();
        let data = run(&mut release, 900, 4, 0);

        assert_eq!(data.len(), 10);
        let lons: Vec<f64> = data.positions().iter().map(|p| p.lon).collect();
        assert_eq!(lons, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0, 0.0, 1.0]);
        for p in &points {
            let n = data.positions().iter().filter(|q| *q == p).count();
            assert!((2..=3).contains(&n));
        }
    }

    #[test]
    fn needs_points() {
        let err = ContinuousPointsRelease::new(ReleaseSchedule::instantaneous(t0(), 3), vec![]).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }
}

// ── Snapshots and file replay ─────────────────────────────────────────────────

#[cfg(test)]
mod replay {
    use sp_core::{ReleaseRng, WorldPoint};
    use sp_elements::{ArrayKind, Column, ColumnMut, ElementData};

    use super::helpers::t0;
    use crate::{
        ElementSnapshot, FileReplayRelease, Release, ReleaseError, SnapshotSelector,
        read_snapshot_csv, read_snapshot_reader, write_snapshot_csv,
    };

    fn saved_state() -> ElementData {
        let mut data = ElementData::new();
        data.register("spill_num", ArrayKind::Integer).unwrap();
        let rows = data.append(3);
        data.positions_mut()[rows.clone()].copy_from_slice(&[
            WorldPoint::new(-70.1, 41.2, 0.0),
            WorldPoint::new(-70.25, 41.3, 1.5),
            WorldPoint::new(-70.333, 41.45, 0.0),
        ]);
        data.mass_mut()[rows.clone()].copy_from_slice(&[1.5, 2.25, 0.125]);
        data.init_mass_mut()[rows].copy_from_slice(&[2.0, 2.5, 0.5]);
        if let Some(ColumnMut::Integer(v)) = data.column_mut("spill_num") {
            v.copy_from_slice(&[0, 1, 1]);
        }
        data
    }

    #[test]
    fn snapshot_captures_scalar_and_integer_arrays() {
        let snap = ElementSnapshot::from_elements(t0(), &saved_state());
        let names: Vec<&str> = snap.arrays.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["init_mass", "mass", "spill_num"]);
        assert_eq!(snap.array("spill_num"), Some(&[0.0, 1.0, 1.0][..]));
        assert!((snap.total_mass() - 3.875).abs() < 1e-12);
    }

    #[test]
    fn replay_restores_the_saved_rows_in_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let saved = saved_state();
        let first = ElementSnapshot::from_elements(t0(), &saved);
        let mut later = ElementSnapshot::from_elements(t0() + 3_600, &saved);
        later.positions[0].lon = -71.0;
        write_snapshot_csv(&[first, later.clone()], &path).unwrap();

        let mut release = FileReplayRelease::from_csv(&path, SnapshotSelector::Last, None).unwrap();
        assert_eq!(release.release_time(), t0() + 3_600);
        assert!((release.total_release_mass() - 3.875).abs() < 1e-12);

        release.prepare_for_model_run(900).unwrap();
        let rt = release.release_time();
        assert_eq!(release.num_elements_to_release(rt - 900, 900, 0), 0);
        let n = release.num_elements_to_release(rt, 900, 0);
        assert_eq!(n, 3);

        let mut data = ElementData::new();
        data.register("spill_num", ArrayKind::Integer).unwrap();
        data.append(n);
        release
            .initialize_elements(n, &mut data, rt, 900, &mut ReleaseRng::new(0))
            .unwrap();
        assert_eq!(data.positions(), later.positions.as_slice());
        assert_eq!(data.mass(), saved.mass());
        assert_eq!(data.init_mass(), saved.init_mass());
        assert!(matches!(data.column("spill_num"), Some(Column::Integer(v)) if v == [0, 1, 1]));

        assert_eq!(release.num_elements_to_release(rt + 900, 900, n), 0);
    }

    #[test]
    fn selects_records_by_index_and_time() {
        let saved = saved_state();
        let records: Vec<ElementSnapshot> = [0, 3_600, 7_200]
            .into_iter()
            .map(|dt| ElementSnapshot::from_elements(t0() + dt, &saved))
            .collect();

        assert_eq!(SnapshotSelector::Index(0).select(&records).map(|r| r.time), Some(t0()));
        assert_eq!(SnapshotSelector::Index(-1).select(&records).map(|r| r.time), Some(t0() + 7_200));
        assert_eq!(SnapshotSelector::Index(-3).select(&records).map(|r| r.time), Some(t0()));
        assert!(SnapshotSelector::Index(-4).select(&records).is_none());
        assert!(SnapshotSelector::Index(3).select(&records).is_none());
        assert_eq!(
            SnapshotSelector::Time(t0() + 5_000).select(&records).map(|r| r.time),
            Some(t0() + 3_600)
        );
        assert_eq!(
            SnapshotSelector::Time(t0() + 1_800).select(&records).map(|r| r.time),
            Some(t0())
        );
    }

    #[test]
    fn missing_init_mass_copies_mass() {
        let csv = "time,lon,lat,z,mass\n\
                   2024-01-01T06:00:00,1,2,0,4\n\
                   2024-01-01T06:00:00,3,4,0,6\n";
        let records = read_snapshot_reader(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let release = FileReplayRelease::new(records[0].clone(), Some(t0())).unwrap();
        assert_eq!(release.release_time(), t0());
        assert_eq!(release.snapshot().array("init_mass"), Some(&[4.0, 6.0][..]));
        assert_eq!(release.total_release_mass(), 10.0);
    }

    #[test]
    fn unmatched_arrays_are_ignored() {
        let csv = "time,lon,lat,z,mass,windage\n2024-01-01T00:00:00,1,2,0,4,0.03\n";
        let records = read_snapshot_reader(csv.as_bytes()).unwrap();
        let mut release = FileReplayRelease::new(records[0].clone(), None).unwrap();
        release.prepare_for_model_run(60).unwrap();
        let mut data = ElementData::new();
        data.append(1);
        release
            .initialize_elements(1, &mut data, t0(), 60, &mut ReleaseRng::new(0))
            .unwrap();
        assert_eq!(data.mass(), [4.0]);
        assert!(!data.contains("windage"));
    }

    #[test]
    fn count_mismatch_and_empty_snapshot() {
        let csv = "time,lon,lat,z,mass\n2024-01-01T00:00:00,1,2,0,4\n";
        let records = read_snapshot_reader(csv.as_bytes()).unwrap();
        let mut release = FileReplayRelease::new(records[0].clone(), None).unwrap();
        release.prepare_for_model_run(60).unwrap();
        let mut data = ElementData::new();
        data.append(2);
        let err = release
            .initialize_elements(2, &mut data, t0(), 60, &mut ReleaseRng::new(0))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::Consistency(_)));

        let empty = ElementSnapshot {
            time: t0(),
            positions: vec![],
            arrays: Default::default(),
        };
        assert!(matches!(
            FileReplayRelease::new(empty, None).unwrap_err(),
            ReleaseError::Configuration(_)
        ));
    }

    #[test]
    fn header_without_position_columns_is_rejected() {
        let err = read_snapshot_reader("time,x,y\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn read_groups_consecutive_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.csv");
        let saved = saved_state();
        write_snapshot_csv(
            &[
                ElementSnapshot::from_elements(t0(), &saved),
                ElementSnapshot::from_elements(t0() + 60, &saved),
            ],
            &path,
        )
        .unwrap();
        let records = read_snapshot_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.len() == 3));
    }
}

// ── Loaders ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use sp_core::WorldPoint;

    use super::helpers::t0;
    use crate::loader::parse_splots;
    use crate::{Release, ReleaseError, grid_release, load_positions_reader, release_from_splot_data};

    #[test]
    fn positions_from_csv() {
        let csv = "lon,lat,z\n-70.1,41.2,0\n-70.2,41.3,5\n";
        let positions = load_positions_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            positions,
            vec![WorldPoint::new(-70.1, 41.2, 0.0), WorldPoint::new(-70.2, 41.3, 5.0)]
        );
    }

    #[test]
    fn grid_covers_bounds() {
        let release = grid_release(t0(), ((-1.0, 10.0), (1.0, 12.0)), 3).unwrap();
        let positions = release.custom_positions();
        assert_eq!(positions.len(), 9);
        assert_eq!(release.schedule().num_elements(), Some(9));
        assert_eq!(positions[0], WorldPoint::surface(-1.0, 10.0));
        assert_eq!(positions[4], WorldPoint::surface(0.0, 11.0));
        assert_eq!(positions[8], WorldPoint::surface(1.0, 12.0));
        assert_eq!(release.release_time(), t0());
    }

    #[test]
    fn grid_rejects_zero_resolution() {
        let err = grid_release(t0(), ((0.0, 0.0), (1.0, 1.0)), 0).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn splots_expand_by_count() {
        let positions = parse_splots("# lon lat n\n-88.1 28.5 2\n\n-88.2 28.6 3.0\n").unwrap();
        assert_eq!(positions.len(), 5);
        assert_eq!(positions[1], WorldPoint::surface(-88.1, 28.5));
        assert_eq!(positions[2], WorldPoint::surface(-88.2, 28.6));
        assert!(parse_splots("1 2\n").is_err());
    }

    #[test]
    fn splot_file_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splots.txt");
        std::fs::write(&path, "-88.1 28.5 4\n-88.2 28.6 1\n").unwrap();
        let release = release_from_splot_data(t0(), &path).unwrap();
        assert_eq!(release.custom_positions().len(), 5);
        assert_eq!(release.schedule().num_elements(), Some(5));
    }
}
