pub mod csv_dataset;

pub use csv_dataset::{read_csv_dataset, read_label_columns, CsvDataset, DatasetReaderConfig};
