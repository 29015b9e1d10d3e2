//! Formato de moneda para la frontera de la API (locale id-ID).

/// Formatear un monto con separador de miles `.` y prefijo opcional `Rp`
pub fn format_currency(amount: f64, with_symbol: bool) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if with_symbol {
        format!("{}Rp {}", sign, grouped)
    } else {
        format!("{}{}", sign, grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(3_121_500.0, true), "Rp 3.121.500");
        assert_eq!(format_currency(312_150.0, false), "312.150");
        assert_eq!(format_currency(999.4, false), "999");
        assert_eq!(format_currency(0.0, true), "Rp 0");
        assert_eq!(format_currency(-1500.0, true), "-Rp 1.500");
    }
}
