use std::error::Error as StdError;
use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::Error;
use crate::report::Report;
use crate::shipment::Mode;

const CHART_SIZE: (u32, u32) = (1400, 800);

fn mode_color(mode: Mode) -> RGBColor {
    match mode {
        Mode::Flight => RGBColor(255, 127, 14),
        Mode::Ship => RGBColor(31, 119, 180),
        Mode::Road => RGBColor(44, 160, 44),
    }
}

/// Write the allocation chart as an SVG file
pub fn render_svg(report: &Report, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    {
        let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
        draw(&root, report).map_err(|e| Error::Chart(e.to_string()))?;
    }
    info!("Chart written to {}", path.display());
    Ok(())
}

/// Render the allocation chart to an SVG document in memory
pub fn render_svg_string(report: &Report) -> Result<String, Error> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        draw(&root, report).map_err(|e| Error::Chart(e.to_string()))?;
    }
    Ok(svg)
}

fn draw(root: &DrawingArea<SVGBackend<'_>, Shift>, report: &Report) -> Result<(), Box<dyn StdError>> {
    root.fill(&WHITE)?;

    let panels = root.split_evenly((1, 2));
    draw_warehouse_panel(&panels[0], report)?;
    draw_mode_panel(&panels[1], report)?;

    root.present()?;
    Ok(())
}

/// Stacked bars: allocated kg per warehouse, one segment per mode, with the
/// warehouse capacity marked above each bar
fn draw_warehouse_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, report: &Report) -> Result<(), Box<dyn StdError>> {
    let names: Vec<String> = report.warehouses.iter().map(|w| w.warehouse.to_string()).collect();
    let y_max = report
        .warehouses
        .iter()
        .map(|w| w.weight_kg.max(w.capacity_kg))
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption("Weight Allocation by Warehouse", ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d((0..names.len() as i32).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Warehouse")
        .y_desc("Weight (kg)")
        .x_label_formatter(&|v| segment_label(v, &names))
        .draw()?;

    let mut bottoms = vec![0.0; report.warehouses.len()];
    for summary in &report.modes {
        let mode = summary.mode;
        let color = mode_color(mode);

        let bars: Vec<Rectangle<(SegmentValue<i32>, f64)>> = report
            .warehouses
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let kg = report.row(w.warehouse, mode).map(|r| r.weight_kg).unwrap_or(0.0);
                let bottom = bottoms[i];
                bottoms[i] += kg;
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i as i32), bottom),
                        (SegmentValue::Exact(i as i32 + 1), bottom + kg),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, 15, 15);
                bar
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(format!("{} ({}/kg)", mode, summary.rate))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .draw_series(report.warehouses.iter().enumerate().map(|(i, w)| {
            PathElement::new(
                vec![
                    (SegmentValue::Exact(i as i32), w.capacity_kg),
                    (SegmentValue::Exact(i as i32 + 1), w.capacity_kg),
                ],
                BLACK.stroke_width(2),
            )
        }))?
        .label("capacity")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    Ok(())
}

/// Allocated kg per mode, each bar labelled with its weight and cost
fn draw_mode_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, report: &Report) -> Result<(), Box<dyn StdError>> {
    let names: Vec<String> = report.modes.iter().map(|m| m.mode.to_string()).collect();
    let y_max = report.modes.iter().map(|m| m.weight_kg).fold(0.0, f64::max).max(1.0) * 1.2;

    let mut chart = ChartBuilder::on(area)
        .caption("Total Allocation by Shipping Mode", ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d((0..names.len() as i32).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Shipping Mode")
        .y_desc("Weight (kg)")
        .x_label_formatter(&|v| segment_label(v, &names))
        .draw()?;

    chart.draw_series(report.modes.iter().enumerate().map(|(i, m)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i as i32), 0.0),
                (SegmentValue::Exact(i as i32 + 1), m.weight_kg),
            ],
            mode_color(m.mode).mix(0.7).filled(),
        );
        bar.set_margin(0, 0, 20, 20);
        bar
    }))?;

    chart.draw_series(report.modes.iter().enumerate().map(|(i, m)| {
        Text::new(
            format!("{:.1} kg / cost {:.2}", m.weight_kg, m.cost),
            (SegmentValue::CenterOf(i as i32), m.weight_kg + y_max * 0.02),
            ("sans-serif", 14).into_font().color(&BLACK),
        )
    }))?;

    Ok(())
}

fn segment_label(value: &SegmentValue<i32>, names: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            usize::try_from(*i).ok().and_then(|i| names.get(i)).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::aggregate::ShipmentTotals;
    use crate::allocation::{Allocation, AllocationCell};
    use crate::shipment::{ShipmentRecord, Warehouse};

    fn report() -> Report {
        let totals = ShipmentTotals::from_records(&[
            ShipmentRecord::new(Warehouse::A, Mode::Flight, 600_000.0),
            ShipmentRecord::new(Warehouse::B, Mode::Road, 400_000.0),
        ])
        .unwrap();
        let allocation = Allocation {
            cells: vec![
                AllocationCell { warehouse: Warehouse::A, mode: Mode::Flight, weight_kg: 200.0 },
                AllocationCell { warehouse: Warehouse::A, mode: Mode::Ship, weight_kg: 300.0 },
                AllocationCell { warehouse: Warehouse::A, mode: Mode::Road, weight_kg: 100.0 },
                AllocationCell { warehouse: Warehouse::B, mode: Mode::Flight, weight_kg: 0.0 },
                AllocationCell { warehouse: Warehouse::B, mode: Mode::Ship, weight_kg: 0.0 },
                AllocationCell { warehouse: Warehouse::B, mode: Mode::Road, weight_kg: 400.0 },
            ],
            total_cost: 9500.0,
            totals,
            rates: BTreeMap::from([(Mode::Flight, 20.0), (Mode::Ship, 10.0), (Mode::Road, 5.0)]),
            capacity_factor: 1.1,
            binding_constraints: Vec::new(),
        };
        Report::from_allocation(&allocation)
    }

    #[test]
    fn test_svg_contains_both_panels() {
        let svg = render_svg_string(&report()).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Weight Allocation by Warehouse"));
        assert!(svg.contains("Total Allocation by Shipping Mode"));
        assert!(svg.contains("Flight (20/kg)"));
        assert!(svg.contains("500.0 kg / cost 2500.00"));
    }

    #[test]
    fn test_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allocation.svg");

        render_svg(&report(), &path).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn test_segment_labels() {
        let names = vec!["A".to_string(), "B".to_string()];
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &names), "B");
        assert_eq!(segment_label(&SegmentValue::CenterOf(5), &names), "");
        assert_eq!(segment_label(&SegmentValue::Last, &names), "");
    }
}
