use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::sample::io_common::{excel_serial_date, make_default_id, PoolColumns};
use crate::sample::*;

fn get_range(path: &str, worksheet_name_o: Option<&str>) -> BSampleResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name,
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(SampleError::EmptyExcel {
                path: path.to_string(),
            })),
            [(worksheet_name, wrange)] => {
                debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet_name);
                Ok(wrange.clone())
            }
            _ => Err(Box::new(SampleError::AmbiguousWorksheet {
                path: path.to_string(),
            })),
        }
    }
}

fn cell_to_string(cell: &DataType, lineno: usize) -> BSampleResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        // Integral numbers are often stored as floats.
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok((*f as i64).to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::DateTime(serial) => Ok(excel_serial_date(*serial)
            .map(|d| d.to_string())
            .unwrap_or_default()),
        DataType::Empty => Ok(String::new()),
        _ => Err(Box::new(SampleError::ExcelWrongCellType {
            lineno,
            content: format!("{:?}", cell),
        })),
    }
}

pub fn read_pool_excel(
    path: &str,
    worksheet_name: Option<&str>,
    today: NaiveDate,
) -> BSampleResult<Vec<RespondentFields>> {
    let wrange = get_range(path, worksheet_name)?;
    let default_id = make_default_id(path);

    let mut iter = wrange.rows();
    let header_cells = iter.next().context(EmptyExcelSnafu { path })?;
    let mut header: Vec<String> = Vec::new();
    for cell in header_cells {
        header.push(cell_to_string(cell, 1)?);
    }
    debug!("read_pool_excel: header: {:?}", header);
    let columns = PoolColumns::from_header(&header, path)?;

    let mut res: Vec<RespondentFields> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let mut cells: Vec<String> = Vec::with_capacity(row.len());
        for cell in row {
            cells.push(cell_to_string(cell, lineno)?);
        }
        if cells.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        res.push(columns.fields(&cells, lineno, &default_id, today)?);
    }
    info!("read_pool_excel: {} respondents read from {}", res.len(), path);
    Ok(res)
}
