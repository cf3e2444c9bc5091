#![cfg(feature = "web")]
use plotters::prelude::*;
use std::error::Error;
use std::io::Cursor;

use crate::analytics::WeeklyPoint;
use crate::stats::{QuantitySeries, axis_max_tick};

const BAR_COLOR: RGBColor = RGBColor(75, 85, 99);
const EMPTY_BAR_COLOR: RGBColor = RGBColor(229, 231, 235);
const DONATED_COLOR: RGBColor = RGBColor(108, 99, 255);
const WASTE_COLOR: RGBColor = RGBColor(255, 107, 107);

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            x_label: String::new(),
            y_label: "Quantity".to_string(),
            width: 800,
            height: 480,
        }
    }
}

// Turn a raw RGB buffer into PNG bytes
fn encode_png(width: u32, height: u32, pixels: Vec<u8>) -> Result<Vec<u8>, Box<dyn Error>> {
    let image = image::RgbImage::from_raw(width, height, pixels)
        .ok_or("pixel buffer does not match image size")?;
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)?;
    Ok(png)
}

fn pixel_buffer(options: &GraphOptions) -> Vec<u8> {
    vec![0u8; options.width as usize * options.height as usize * 3]
}

fn label_at(labels: &[String], x: i32) -> String {
    usize::try_from(x)
        .ok()
        .and_then(|i| labels.get(i))
        .cloned()
        .unwrap_or_default()
}

/// Bar chart of quantities per day (Mon..Sun) for one week.
///
/// The Y axis tops out at the next multiple of 50 above the busiest day, and
/// empty days are drawn as a short grey stub so every day stays visible.
pub fn weekly_quantity_chart(
    series: &QuantitySeries,
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let labels: Vec<String> = series.labels().iter().map(|l| l.to_string()).collect();
    let values: Vec<u64> = series.qty_per_day.to_vec();
    bar_chart(&labels, &values, series.axis_max(), options)
}

/// Bar chart of total quantity per category.
pub fn category_chart(
    categories: &[(String, u64)],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let labels: Vec<String> = categories.iter().map(|(name, _)| name.clone()).collect();
    let values: Vec<u64> = categories.iter().map(|(_, qty)| *qty).collect();
    let max = values.iter().copied().max().unwrap_or(0);
    bar_chart(&labels, &values, axis_max_tick(max), options)
}

fn bar_chart(
    labels: &[String],
    values: &[u64],
    axis_max: u64,
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut pixels = pixel_buffer(options);
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let slots = values.len().max(1) as i32;
        let stub = (axis_max / 40).max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 28).into_font())
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(48)
            .build_cartesian_2d(0..slots, 0..axis_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(slots as usize)
            .x_label_formatter(&|x| label_at(labels, *x))
            .y_labels(3)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(values.iter().enumerate().map(|(i, &qty)| {
            let x = i as i32;
            let (top, color) = if qty == 0 {
                (stub, EMPTY_BAR_COLOR)
            } else {
                (qty.max(stub), BAR_COLOR)
            };
            let mut bar = Rectangle::new([(x, 0), (x + 1, top)], color.filled());
            bar.set_margin(0, 0, 14, 14);
            bar
        }))?;

        root.present()?;
    }
    encode_png(options.width, options.height, pixels)
}

/// Grouped bars of quantity and waste per week for one item.
pub fn item_timeline_chart(
    points: &[WeeklyPoint],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let labels: Vec<String> = points.iter().map(|p| p.label.clone()).collect();
    let max = points.iter().map(|p| p.quantity.max(p.waste)).max().unwrap_or(0);
    let axis_max = axis_max_tick(max);
    let slots = points.len().max(1) as i32;

    let mut pixels = pixel_buffer(options);
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 28).into_font())
            .margin(12)
            .x_label_area_size(36)
            .y_label_area_size(48)
            .build_cartesian_2d(0..slots * 2, 0..axis_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(points.len().max(1))
            .x_label_formatter(&|x| {
                if x % 2 == 0 { label_at(&labels, x / 2) } else { String::new() }
            })
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart
            .draw_series(points.iter().enumerate().map(|(i, p)| {
                let x = i as i32 * 2;
                let mut bar = Rectangle::new([(x, 0), (x + 1, p.quantity)], DONATED_COLOR.filled());
                bar.set_margin(0, 0, 8, 2);
                bar
            }))?
            .label("Quantity")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], DONATED_COLOR.filled()));

        chart
            .draw_series(points.iter().enumerate().map(|(i, p)| {
                let x = i as i32 * 2 + 1;
                let mut bar = Rectangle::new([(x, 0), (x + 1, p.waste)], WASTE_COLOR.filled());
                bar.set_margin(0, 0, 2, 8);
                bar
            }))?
            .label("Waste")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], WASTE_COLOR.filled()));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
    }
    encode_png(options.width, options.height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_outside_range_are_blank() {
        let labels = vec!["Mon".to_string(), "Tue".to_string()];
        assert_eq!(label_at(&labels, 1), "Tue");
        assert_eq!(label_at(&labels, 2), "");
        assert_eq!(label_at(&labels, -1), "");
    }

    #[test]
    fn raw_buffer_encodes_to_png() {
        let options = GraphOptions {
            width: 4,
            height: 2,
            ..Default::default()
        };
        let png = encode_png(4, 2, pixel_buffer(&options)).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert!(encode_png(4, 2, vec![0; 3]).is_err());
    }
}
