use machine_learning::training::History;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, LegendPosition, Paragraph, Row,
        Table,
    },
};

use super::theme::Theme;
use crate::metrics::{ConfusionMatrix, RocCurve};

/// A figure shown by the viewer.
pub enum Figure<'a> {
    Confusion {
        matrix: &'a ConfusionMatrix,
        class_names: &'a [String; 2],
    },
    Roc(&'a RocCurve),
    Curves(&'a History),
}

impl Figure<'_> {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Confusion { .. } => "Confusion Matrix (Test Dataset)",
            Self::Roc(_) => "Receiver Operating Characteristic (Test Dataset)",
            Self::Curves(_) => "Training History",
        }
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        match self {
            Self::Confusion {
                matrix,
                class_names,
            } => confusion(f, area, self.title(), matrix, class_names),
            Self::Roc(roc) => roc_curve(f, area, self.title(), roc),
            Self::Curves(history) => curves(f, area, history),
        }
    }
}

fn framed(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .title(Span::styled(title, Theme::title()))
        .title_alignment(Alignment::Center)
}

fn centered(text: String) -> Text<'static> {
    Text::from(vec![
        Line::default(),
        Line::from(text).alignment(Alignment::Center),
    ])
}

fn confusion(
    f: &mut Frame,
    area: Rect,
    title: &str,
    matrix: &ConfusionMatrix,
    class_names: &[String; 2],
) {
    let block = framed(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [grid, footer] = split(
        inner,
        Direction::Vertical,
        [Constraint::Min(8), Constraint::Length(1)],
    );

    let max = matrix.max().max(1) as f64;
    let header = Row::new(
        std::iter::once(Cell::from(centered("True label".to_string())).style(Theme::muted()))
            .chain(class_names.iter().map(|name| {
                Cell::from(centered(format!("Predicted {name}"))).style(Theme::title())
            })),
    )
    .height(3);

    let rows = (0..2).map(|actual| {
        let name = Cell::from(centered(class_names[actual].clone())).style(Theme::title());
        let mut cells = vec![name];

        for predicted in 0..2 {
            let count = matrix.get(actual, predicted);
            cells.push(
                Cell::from(centered(count.to_string())).style(Theme::heat(count as f64 / max)),
            );
        }

        Row::new(cells).height(3)
    });

    let widths = [Constraint::Ratio(1, 3); 3];
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    f.render_widget(table, grid);

    f.render_widget(
        Paragraph::new(Line::from("Predicted label").alignment(Alignment::Center))
            .style(Theme::muted()),
        footer,
    );
}

fn roc_curve(f: &mut Frame, area: Rect, title: &str, roc: &RocCurve) {
    let points = roc.points();
    // dots along the diagonal read as a dashed line
    let chance: Vec<(f64, f64)> = (0..=50).map(|i| i as f64 / 50.).map(|v| (v, v)).collect();

    let datasets = vec![
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Theme::series(Theme::CHANCE))
            .data(&chance),
        Dataset::default()
            .name(format!("ROC curve (area = {:.2})", roc.auc()))
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Theme::series(Theme::ROC))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(framed(title))
        .style(Theme::base())
        .x_axis(
            Axis::default()
                .title("False Positive Rate")
                .style(Theme::muted())
                .bounds([0., 1.])
                .labels(ticks(0., 1.)),
        )
        .y_axis(
            Axis::default()
                .title("True Positive Rate")
                .style(Theme::muted())
                .bounds([0., 1.05])
                .labels(ticks(0., 1.05)),
        )
        .legend_position(Some(LegendPosition::BottomRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}

fn curves(f: &mut Frame, area: Rect, history: &History) {
    let [left, right] = split(
        area,
        Direction::Horizontal,
        [Constraint::Percentage(50), Constraint::Percentage(50)],
    );

    let loss_max = history
        .loss
        .iter()
        .chain(&history.val_loss)
        .copied()
        .filter(|v| v.is_finite())
        .fold(0f32, f32::max);

    series_chart(
        f,
        left,
        "Training and Validation Loss",
        "Loss",
        [&history.loss, &history.val_loss],
        f64::from(loss_max).max(1e-3) * 1.1,
    );
    series_chart(
        f,
        right,
        "Training and Validation Accuracy",
        "Accuracy",
        [&history.accuracy, &history.val_accuracy],
        1.,
    );
}

fn series_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    y_title: &str,
    [train, val]: [&[f32]; 2],
    y_max: f64,
) {
    let to_points = |values: &[f32]| -> Vec<(f64, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ((i + 1) as f64, f64::from(v)))
            .collect()
    };

    let train = to_points(train);
    let val = to_points(val);
    let epochs = train.len().max(2) as f64;

    let mut datasets = vec![
        Dataset::default()
            .name(format!("Training {y_title}"))
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Theme::series(Theme::TRAIN))
            .data(&train),
    ];

    if !val.is_empty() {
        datasets.push(
            Dataset::default()
                .name(format!("Validation {y_title}"))
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Theme::series(Theme::VALIDATION))
                .data(&val),
        );
    }

    let chart = Chart::new(datasets)
        .block(framed(title))
        .style(Theme::base())
        .x_axis(
            Axis::default()
                .title("Epochs")
                .style(Theme::muted())
                .bounds([1., epochs])
                .labels(ticks(1., epochs)),
        )
        .y_axis(
            Axis::default()
                .title(y_title.to_string())
                .style(Theme::muted())
                .bounds([0., y_max])
                .labels(ticks(0., y_max)),
        )
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));

    f.render_widget(chart, area);
}

fn ticks(min: f64, max: f64) -> Vec<Span<'static>> {
    [min, (min + max) / 2., max]
        .into_iter()
        .map(|v| Span::styled(format!("{v:.2}"), Theme::muted()))
        .collect()
}

fn split<const N: usize>(
    area: Rect,
    direction: Direction,
    constraints: [Constraint; N],
) -> [Rect; N] {
    let chunks = Layout::default()
        .direction(direction)
        .constraints(constraints)
        .split(area);

    std::array::from_fn(|i| chunks[i])
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn render(figure: &Figure) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal
            .draw(|f| {
                let area = f.size();
                figure.draw(f, area);
            })
            .unwrap();

        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn confusion_shows_counts_and_labels() {
        let matrix = ConfusionMatrix::new(&[0, 0, 1, 1, 1], &[0, 1, 1, 1, 1]).unwrap();
        let names = ["No Hyperglycemia".to_string(), "Hyperglycemia".to_string()];

        let screen = render(&Figure::Confusion {
            matrix: &matrix,
            class_names: &names,
        });

        assert!(screen.contains("Confusion Matrix (Test Dataset)"));
        assert!(screen.contains("Predicted Hyperglycemia"));
        assert!(screen.contains("No Hyperglycemia"));
        assert!(screen.contains("Predicted label"));
    }

    #[test]
    fn roc_shows_the_area() {
        let roc = RocCurve::new(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        let screen = render(&Figure::Roc(&roc));

        assert!(screen.contains("Receiver Operating Characteristic (Test Dataset)"));
        assert!(screen.contains("ROC curve (area = 0.75)"));
        assert!(screen.contains("False Positive Rate"));
    }

    #[test]
    fn curves_side_by_side() {
        let history = History {
            loss: vec![0.7, 0.5, 0.4],
            accuracy: vec![0.6, 0.7, 0.8],
            val_loss: vec![0.65, 0.55, 0.5],
            val_accuracy: vec![0.62, 0.7, 0.75],
            ..Default::default()
        };

        let screen = render(&Figure::Curves(&history));

        assert!(screen.contains("Training and Validation Loss"));
        assert!(screen.contains("Training and Validation Accuracy"));
    }

    #[test]
    fn curves_without_validation() {
        let history = History {
            loss: vec![0.7],
            accuracy: vec![0.6],
            ..Default::default()
        };

        let screen = render(&Figure::Curves(&history));
        assert!(screen.contains("Training and Validation Loss"));
    }
}
