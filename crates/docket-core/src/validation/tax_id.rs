//! Brazilian tax identifier checks (CPF for people, CNPJ for companies)
//!
//! Formatting characters are ignored: only the digits of the input are checked.

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

fn digits_of(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|pair| pair[0] == pair[1])
}

fn cpf_check_digit(partial: &[u32]) -> u32 {
    let weight_start = partial.len() as u32 + 1;
    let sum: u32 = partial
        .iter()
        .enumerate()
        .map(|(i, d)| (weight_start - i as u32) * d)
        .sum();
    let digit = 11 - (sum % 11);
    if digit > 9 {
        0
    } else {
        digit
    }
}

fn cnpj_check_digit(partial: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = partial.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

/// Validate a CPF (11 digits, two check digits).
pub fn validate_cpf(value: &str) -> bool {
    let digits = digits_of(value);
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }

    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

/// Validate a CNPJ (14 digits, two check digits).
pub fn validate_cnpj(value: &str) -> bool {
    let digits = digits_of(value);
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }

    cnpj_check_digit(&digits[..12], &CNPJ_FIRST_WEIGHTS) == digits[12]
        && cnpj_check_digit(&digits[..13], &CNPJ_SECOND_WEIGHTS) == digits[13]
}

/// Validate a value that may be either a CPF or a CNPJ, chosen by digit count.
pub fn validate_cpf_cnpj(value: &str) -> bool {
    match digits_of(value).len() {
        11 => validate_cpf(value),
        14 => validate_cnpj(value),
        _ => false,
    }
}
